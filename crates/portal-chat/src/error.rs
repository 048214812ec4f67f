use thiserror::Error;

/// Unified error type for chat client operations
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("api error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("session creation rejected by server")]
    SessionRejected,

    #[error("stream error: {0}")]
    Stream(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chat client not initialized")]
    NotInitialized,

    #[error("chat client disposed")]
    Disposed,
}

impl ChatError {
    /// Create a stream error
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChatError::Api { status: 500, message: "boom".into() };
        assert_eq!(err.to_string(), "api error: 500 - boom");
    }
}
