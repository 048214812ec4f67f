//! Speech input adapter.
//!
//! A transcript source only produces text; the text goes through the normal
//! `send_message` path. Sources the host cannot provide report themselves as
//! unavailable and the user gets a notice instead.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::client::{StreamingChatClient, TurnOutcome};
use crate::error::ChatResult;
use crate::view::ChatView;

pub const VOICE_UNSUPPORTED: &str = "您的设备不支持语音输入功能";
pub const NO_SPEECH: &str = "未检测到语音,请重试";
pub const VOICE_FAILED: &str = "语音识别失败,请重试";

/// 语音转文字输入源
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// 当前环境是否支持该输入源
    fn is_available(&self) -> bool;

    /// 识别一段语音，`None` 表示没有检测到语音
    async fn listen(&self) -> ChatResult<Option<String>>;
}

/// Reads a finished transcript from a text file.
#[derive(Debug, Clone)]
pub struct FileTranscript {
    path: PathBuf,
}

impl FileTranscript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TranscriptSource for FileTranscript {
    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    async fn listen(&self) -> ChatResult<Option<String>> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

/// Capture one utterance and send it as a user message.
///
/// Recognition problems are shown as notices and yield `TurnOutcome::Ignored`.
pub async fn send_transcript<V, S>(
    client: &mut StreamingChatClient<V>,
    source: &S,
) -> ChatResult<TurnOutcome>
where
    V: ChatView,
    S: TranscriptSource + ?Sized,
{
    if !source.is_available() {
        client.view_mut().notify(VOICE_UNSUPPORTED);
        return Ok(TurnOutcome::Ignored);
    }

    match source.listen().await {
        Ok(Some(text)) => {
            tracing::debug!("Transcript received: {} chars", text.chars().count());
            client.send_message(&text).await
        }
        Ok(None) => {
            client.view_mut().notify(NO_SPEECH);
            Ok(TurnOutcome::Ignored)
        }
        Err(e) => {
            tracing::warn!("Speech recognition failed: {}", e);
            client.view_mut().notify(VOICE_FAILED);
            Ok(TurnOutcome::Ignored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_transcript_trims_text() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("utterance.txt");
        tokio::fs::write(&path, "  停车位怎么申请?\n").await.unwrap();

        let source = FileTranscript::new(&path);
        assert!(source.is_available());
        assert_eq!(source.listen().await.unwrap().as_deref(), Some("停车位怎么申请?"));
    }

    #[tokio::test]
    async fn test_blank_transcript_means_no_speech() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("silence.txt");
        tokio::fs::write(&path, " \n").await.unwrap();

        assert_eq!(FileTranscript::new(&path).listen().await.unwrap(), None);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let source = FileTranscript::new(temp_dir.path().join("nope.txt"));
        assert!(!source.is_available());
    }
}
