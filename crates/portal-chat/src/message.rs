use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "我"),
            MessageRole::Assistant => write!(f, "AI"),
        }
    }
}

/// A committed chat turn. Conversations only ever append these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Local wall-clock time, `HH:MM`
    pub time: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            time: clock_time(),
        }
    }

    pub fn assistant(content: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            time: time.into(),
        }
    }
}

/// Current local time as `HH:MM`
pub fn clock_time() -> String {
    format_clock(&Local::now())
}

pub fn format_clock(at: &DateTime<Local>) -> String {
    at.format("%H:%M").to_string()
}
