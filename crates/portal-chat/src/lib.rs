//! # Portal Chat
//!
//! 社区物业门户的智能客服客户端。
//!
//! ## 功能特性
//!
//! - **会话管理**：恢复或创建会话标识，按界面分别持久化
//! - **流式回复**：逐行解析 `data: {...}` 事件，边收边显示
//! - **轮次状态机**：占位消息只会被提交或丢弃一次
//! - **清空对话**：确认后清空服务端历史并开启新会话
//! - **语音输入**：语音转文字后走同一条发送路径
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use portal_chat::{ApiConfig, ChatApi, ChatOptions, MemorySessionStore, StreamingChatClient};
//! use std::sync::Arc;
//!
//! let api = ChatApi::new(&ApiConfig::new("http://127.0.0.1:8000"))?;
//! let store = Arc::new(MemorySessionStore::new());
//! let mut client = StreamingChatClient::new(api, store, my_view, ChatOptions::new("pc_chat_session_id"));
//!
//! client.init().await?;
//! client.send_message("物业费怎么缴纳?").await?;
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod event;
pub mod message;
pub mod sse;
pub mod store;
pub mod turn;
pub mod view;
pub mod voice;

// 重新导出主要类型
pub use api::{
    ApiConfig, ChatApi, ChatReply, HealthResponse, HistoryEntry, HistoryResponse,
    ReplyByteStream, ServiceInfo,
};
pub use client::{
    ChatHandle, ChatOptions, DiscardReason, Lifecycle, ReplyMode, StreamingChatClient,
    TurnOutcome, CLEAR_CONFIRM_PROMPT, NETWORK_ERROR, SERVICE_UNAVAILABLE, SESSION_INIT_FAILED,
};
pub use error::{ChatError, ChatResult};
pub use event::StreamEvent;
pub use message::{clock_time, format_clock, Message, MessageRole};
pub use sse::{SseDecoder, DATA_PREFIX, MAX_LINE_BYTES};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use turn::{AssistantTurn, TurnState, STREAMING_MARKER};
pub use view::ChatView;
pub use voice::{
    send_transcript, FileTranscript, TranscriptSource, NO_SPEECH, VOICE_FAILED,
    VOICE_UNSUPPORTED,
};

/// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
