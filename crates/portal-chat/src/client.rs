use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ChatApi, HistoryEntry};
use crate::error::{ChatError, ChatResult};
use crate::event::StreamEvent;
use crate::message::{clock_time, Message};
use crate::sse::SseDecoder;
use crate::store::SessionStore;
use crate::turn::AssistantTurn;
use crate::view::ChatView;

pub const SESSION_INIT_FAILED: &str = "初始化失败,请刷新页面重试";
pub const SERVICE_UNAVAILABLE: &str = "抱歉,服务暂时不可用,请稍后重试";
pub const NETWORK_ERROR: &str = "网络错误,请检查连接后重试";
pub const CLEAR_CONFIRM_PROMPT: &str = "确定要清空对话记录吗?";

/// How the assistant reply is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyMode {
    /// `POST /chat/stream`, rendered chunk by chunk
    #[default]
    Stream,
    /// `POST /chat`, rendered once complete
    Blocking,
}

/// Per-surface settings of the shared client
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Key of the persisted session id; distinct per surface
    pub storage_key: String,
    /// Show a typing indicator until the first text arrives
    pub typing_indicator: bool,
    pub reply_mode: ReplyMode,
}

impl ChatOptions {
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
            typing_indicator: false,
            reply_mode: ReplyMode::Stream,
        }
    }

    pub fn with_typing_indicator(mut self, enabled: bool) -> Self {
        self.typing_indicator = enabled;
        self
    }

    pub fn with_reply_mode(mut self, mode: ReplyMode) -> Self {
        self.reply_mode = mode;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Init,
    Active,
    Disposed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// The stream reported an error; carries the notice that was shown
    Server(String),
    /// Request, status or read failure
    Transport,
    /// Stopped through the handle or by disposal
    Stopped,
}

/// Result of one `send_message`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input, nothing happened
    Ignored,
    Finalized(Message),
    Discarded(DiscardReason),
}

/// Cloneable remote control for a client: stop the running turn or dispose
/// the whole client from outside the task that drives it.
#[derive(Debug, Clone)]
pub struct ChatHandle {
    shutdown: CancellationToken,
    current_turn: Arc<Mutex<Option<CancellationToken>>>,
}

impl ChatHandle {
    fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            current_turn: Arc::new(Mutex::new(None)),
        }
    }

    /// Stop the turn in flight. Returns false when no turn is running.
    pub fn stop_turn(&self) -> bool {
        match self.current_turn.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a turn is in flight right now
    pub fn turn_running(&self) -> bool {
        self.current_turn.lock().is_some()
    }

    /// Tear the client down; any running turn is stopped.
    pub fn dispose(&self) {
        self.shutdown.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn begin_turn(&self) -> CancellationToken {
        let token = self.shutdown.child_token();
        *self.current_turn.lock() = Some(token.clone());
        token
    }

    fn end_turn(&self) {
        self.current_turn.lock().take();
    }
}

enum TurnEnd {
    Done(Option<String>),
    ServerError(Option<String>),
    Transport(ChatError),
    Cancelled,
}

/// Session lifecycle plus one streamed exchange per user message.
///
/// Mutating operations take `&mut self`, so a client runs at most one turn
/// at a time.
pub struct StreamingChatClient<V> {
    api: ChatApi,
    store: Arc<dyn SessionStore>,
    view: V,
    options: ChatOptions,
    session_id: Option<String>,
    messages: Vec<Message>,
    lifecycle: Lifecycle,
    handle: ChatHandle,
    turn_counter: u64,
    typing_shown: bool,
}

impl<V: ChatView> StreamingChatClient<V> {
    pub fn new(api: ChatApi, store: Arc<dyn SessionStore>, view: V, options: ChatOptions) -> Self {
        Self {
            api,
            store,
            view,
            options,
            session_id: None,
            messages: Vec::new(),
            lifecycle: Lifecycle::Init,
            handle: ChatHandle::new(),
            turn_counter: 0,
            typing_shown: false,
        }
    }

    pub fn handle(&self) -> ChatHandle {
        self.handle.clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.handle.is_disposed() {
            Lifecycle::Disposed
        } else {
            self.lifecycle
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn api(&self) -> &ChatApi {
        &self.api
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Restore or create the session and move to `Active`.
    ///
    /// A session failure is reported to the view but does not fail init.
    pub async fn init(&mut self) -> ChatResult<()> {
        self.ensure_live()?;
        if self.lifecycle == Lifecycle::Active {
            return Ok(());
        }

        if let Err(e) = self.acquire_session(true).await {
            warn!(key = %self.options.storage_key, "Starting without a session: {}", e);
        }
        self.lifecycle = Lifecycle::Active;
        Ok(())
    }

    /// Reuse the persisted session id, or ask the server for a new one.
    pub async fn ensure_session(&mut self) -> ChatResult<String> {
        self.ensure_live()?;
        self.acquire_session(true).await
    }

    pub async fn send_message(&mut self, text: &str) -> ChatResult<TurnOutcome> {
        self.ensure_live()?;
        if self.lifecycle == Lifecycle::Init {
            return Err(ChatError::NotInitialized);
        }

        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        let user = Message::user(text);
        self.messages.push(user.clone());
        self.view.user_message(&user);

        self.turn_counter += 1;
        let mut turn = AssistantTurn::new(self.turn_counter, clock_time());
        self.view.turn_started(&turn);
        self.set_typing(true);

        let token = self.handle.begin_turn();
        let end = self.run_turn(text, &mut turn, &token).await;
        self.handle.end_turn();

        Ok(self.settle(turn, end).await)
    }

    /// Ask for confirmation, then wipe server history, the local
    /// conversation and the persisted id, and start a fresh session.
    ///
    /// Returns false when the user declined.
    pub async fn clear_chat(&mut self) -> ChatResult<bool> {
        self.ensure_live()?;
        if self.lifecycle == Lifecycle::Init {
            return Err(ChatError::NotInitialized);
        }

        if !self.view.confirm(CLEAR_CONFIRM_PROMPT) {
            debug!("Clear declined");
            return Ok(false);
        }

        if let Some(id) = self.session_id.clone() {
            if let Err(e) = self.api.clear_history(&id).await {
                warn!(session_id = %id, "Failed to clear server history: {}", e);
            }
        }

        self.messages.clear();
        self.view.conversation_cleared();

        if let Err(e) = self.store.remove(&self.options.storage_key).await {
            warn!(key = %self.options.storage_key, "Failed to drop persisted session: {}", e);
        }
        self.set_session(None);

        if let Err(e) = self.acquire_session(true).await {
            debug!("No fresh session after clear: {}", e);
        }

        info!("Conversation cleared");
        Ok(true)
    }

    /// Server-side history of the current session
    pub async fn fetch_history(&mut self) -> ChatResult<Vec<HistoryEntry>> {
        self.ensure_live()?;
        match self.session_id.as_deref() {
            Some(id) => Ok(self.api.history(id).await?.history),
            None => Ok(Vec::new()),
        }
    }

    pub fn dispose(&mut self) {
        self.handle.dispose();
        self.lifecycle = Lifecycle::Disposed;
        info!(key = %self.options.storage_key, "Chat client disposed");
    }

    fn ensure_live(&mut self) -> ChatResult<()> {
        if self.handle.is_disposed() {
            self.lifecycle = Lifecycle::Disposed;
        }
        if self.lifecycle == Lifecycle::Disposed {
            return Err(ChatError::Disposed);
        }
        Ok(())
    }

    async fn acquire_session(&mut self, notify: bool) -> ChatResult<String> {
        match self.store.load(&self.options.storage_key).await {
            Ok(Some(id)) => {
                info!(session_id = %id, "Restored session");
                self.set_session(Some(id.clone()));
                return Ok(id);
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to read persisted session: {}", e),
        }

        match self.api.create_session().await {
            Ok(id) => {
                info!(session_id = %id, "Created session");
                self.persist_session(&id).await;
                self.set_session(Some(id.clone()));
                Ok(id)
            }
            Err(e) => {
                warn!("Failed to create session: {}", e);
                self.set_session(None);
                if notify {
                    self.view.notify(SESSION_INIT_FAILED);
                }
                Err(e)
            }
        }
    }

    async fn persist_session(&self, id: &str) {
        if let Err(e) = self.store.save(&self.options.storage_key, id).await {
            warn!(session_id = %id, "Failed to persist session: {}", e);
        }
    }

    fn set_session(&mut self, id: Option<String>) {
        if self.session_id != id {
            self.view.session_changed(id.as_deref());
            self.session_id = id;
        }
    }

    fn set_typing(&mut self, active: bool) {
        if self.options.typing_indicator && self.typing_shown != active {
            self.typing_shown = active;
            self.view.typing(active);
        }
    }

    async fn run_turn(
        &mut self,
        text: &str,
        turn: &mut AssistantTurn,
        token: &CancellationToken,
    ) -> TurnEnd {
        // The backend mints a session when none is sent, so a failure here
        // only costs the round trip.
        if self.session_id.is_none() {
            let acquired = tokio::select! {
                biased;
                _ = token.cancelled() => return TurnEnd::Cancelled,
                acquired = self.acquire_session(false) => acquired,
            };
            if let Err(e) = acquired {
                debug!("Sending without a session id: {}", e);
            }
        }

        match self.options.reply_mode {
            ReplyMode::Stream => self.stream_reply(text, turn, token).await,
            ReplyMode::Blocking => self.blocking_reply(text, turn, token).await,
        }
    }

    async fn stream_reply(
        &mut self,
        text: &str,
        turn: &mut AssistantTurn,
        token: &CancellationToken,
    ) -> TurnEnd {
        let session_id = self.session_id.clone();
        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return TurnEnd::Cancelled,
            opened = self.api.open_stream(text, session_id.as_deref()) => opened,
        };
        let mut body = match opened {
            Ok(body) => body,
            Err(e) => return TurnEnd::Transport(e),
        };

        let mut decoder = SseDecoder::new();
        loop {
            let read = tokio::select! {
                biased;
                _ = token.cancelled() => return TurnEnd::Cancelled,
                read = body.next() => read,
            };

            match read {
                Some(Ok(bytes)) => {
                    let events = decoder.feed(&bytes);
                    if let Some(end) = self.apply_events(turn, events) {
                        return end;
                    }
                }
                Some(Err(e)) => return TurnEnd::Transport(e),
                None => {
                    let events = decoder.finish();
                    return self.apply_events(turn, events).unwrap_or_else(|| {
                        TurnEnd::Transport(ChatError::stream(
                            "reply stream ended without a done event",
                        ))
                    });
                }
            }
        }
    }

    async fn blocking_reply(
        &mut self,
        text: &str,
        turn: &mut AssistantTurn,
        token: &CancellationToken,
    ) -> TurnEnd {
        let session_id = self.session_id.clone();
        let reply = tokio::select! {
            biased;
            _ = token.cancelled() => return TurnEnd::Cancelled,
            reply = self.api.send_blocking(text, session_id.as_deref()) => reply,
        };

        match reply {
            Ok(reply) if reply.success => {
                turn.push_chunk(reply.message.as_deref().unwrap_or_default());
                TurnEnd::Done(reply.session_id)
            }
            Ok(reply) => TurnEnd::ServerError(reply.error),
            Err(e) => TurnEnd::Transport(e),
        }
    }

    /// Apply decoded events in order; stops at the first terminal one.
    fn apply_events(&mut self, turn: &mut AssistantTurn, events: Vec<StreamEvent>) -> Option<TurnEnd> {
        for event in events {
            match event {
                StreamEvent::Chunk { content } => {
                    self.set_typing(false);
                    turn.push_chunk(&content);
                    self.view.turn_updated(turn);
                }
                StreamEvent::Done { session_id } => return Some(TurnEnd::Done(session_id)),
                StreamEvent::Error { message } => return Some(TurnEnd::ServerError(message)),
            }
        }
        None
    }

    async fn settle(&mut self, mut turn: AssistantTurn, end: TurnEnd) -> TurnOutcome {
        if self.handle.is_disposed() {
            // no view updates after teardown
            self.lifecycle = Lifecycle::Disposed;
            turn.discard();
            debug!(turn = turn.id(), "Turn dropped after disposal");
            return TurnOutcome::Discarded(DiscardReason::Stopped);
        }

        self.set_typing(false);

        match end {
            TurnEnd::Done(session_id) => {
                if let Some(id) = session_id {
                    self.persist_session(&id).await;
                    self.set_session(Some(id));
                }
                let Some(message) = turn.finalize() else {
                    return TurnOutcome::Discarded(DiscardReason::Stopped);
                };
                self.messages.push(message.clone());
                self.view.turn_finalized(&turn, &message);
                debug!(turn = turn.id(), chars = message.content.chars().count(), "Turn finalized");
                TurnOutcome::Finalized(message)
            }
            TurnEnd::ServerError(message) => {
                turn.discard();
                self.view.turn_discarded(&turn);
                let notice = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| SERVICE_UNAVAILABLE.to_string());
                warn!(turn = turn.id(), "Server reported an error: {}", notice);
                self.view.notify(&notice);
                TurnOutcome::Discarded(DiscardReason::Server(notice))
            }
            TurnEnd::Transport(e) => {
                warn!(turn = turn.id(), "Reply failed: {}", e);
                turn.discard();
                self.view.turn_discarded(&turn);
                self.view.notify(NETWORK_ERROR);
                TurnOutcome::Discarded(DiscardReason::Transport)
            }
            TurnEnd::Cancelled => {
                info!(turn = turn.id(), "Turn stopped");
                turn.discard();
                self.view.turn_discarded(&turn);
                TurnOutcome::Discarded(DiscardReason::Stopped)
            }
        }
    }
}

impl<V> Drop for StreamingChatClient<V> {
    fn drop(&mut self) {
        self.handle.dispose();
    }
}
