use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

use crate::error::{ChatError, ChatResult};
use crate::message::MessageRole;

/// Raw body of a streaming reply, one item per network read
pub type ReplyByteStream = Pin<Box<dyn Stream<Item = ChatResult<Vec<u8>>> + Send>>;

/// Where the customer-service backend lives
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server root, e.g. `http://127.0.0.1:8000`
    pub server_url: String,
    /// Prefix of the chat endpoints, e.g. `/api`
    pub api_path: String,
    pub connect_timeout: Duration,
    /// Applies to every call except the reply stream
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            api_path: "/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }
}

/// HTTP client for the chat endpoints
#[derive(Debug, Clone)]
pub struct ChatApi {
    server_url: String,
    base_url: String,
    request_timeout: Duration,
    client: Client,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
struct SessionResponse {
    success: bool,
    session_id: Option<String>,
}

/// Reply of the non-streaming `POST /chat`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub message_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryEntry {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub modules: Vec<String>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatApi {
    pub fn new(config: &ApiConfig) -> ChatResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        let server_url = config.server_url.trim_end_matches('/').to_string();
        let api_path = config.api_path.trim_matches('/');
        let base_url = if api_path.is_empty() {
            server_url.clone()
        } else {
            format!("{}/{}", server_url, api_path)
        };

        Ok(Self {
            server_url,
            base_url,
            request_timeout: config.request_timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health_check(&self) -> bool {
        match self.health().await {
            Ok(health) => health.status == "healthy",
            Err(e) => {
                tracing::debug!("Health check failed: {}", e);
                false
            }
        }
    }

    pub async fn health(&self) -> ChatResult<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/health", self.server_url))
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(ensure_success(response, "health check").await?.json().await?)
    }

    pub async fn info(&self) -> ChatResult<ServiceInfo> {
        let response = self
            .client
            .get(format!("{}/info", self.base_url))
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(ensure_success(response, "fetch info").await?.json().await?)
    }

    /// `POST /chat/session`
    pub async fn create_session(&self) -> ChatResult<String> {
        let response = self
            .client
            .post(format!("{}/chat/session", self.base_url))
            .timeout(self.request_timeout)
            .send()
            .await?;

        let body: SessionResponse = ensure_success(response, "create session")
            .await?
            .json()
            .await?;

        match body.session_id {
            Some(id) if body.success && !id.is_empty() => Ok(id),
            _ => Err(ChatError::SessionRejected),
        }
    }

    /// `POST /chat/stream`; the returned stream yields the raw body reads.
    pub async fn open_stream(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> ChatResult<ReplyByteStream> {
        let request = ChatRequest {
            message,
            session_id,
        };

        let response = self
            .client
            .post(format!("{}/chat/stream", self.base_url))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await?;

        let response = ensure_success(response, "open reply stream").await?;

        let stream = response
            .bytes_stream()
            .map(|read| read.map(|bytes| bytes.to_vec()).map_err(ChatError::from));
        Ok(Box::pin(stream))
    }

    /// `POST /chat`, the whole reply in one response
    pub async fn send_blocking(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> ChatResult<ChatReply> {
        let request = ChatRequest {
            message,
            session_id,
        };

        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;

        Ok(ensure_success(response, "send message").await?.json().await?)
    }

    /// `DELETE /chat/history/{id}`; the body is not inspected.
    pub async fn clear_history(&self, session_id: &str) -> ChatResult<()> {
        let response = self
            .client
            .delete(format!("{}/chat/history/{}", self.base_url, session_id))
            .timeout(self.request_timeout)
            .send()
            .await?;

        ensure_success(response, "clear history").await?;
        Ok(())
    }

    /// `GET /chat/history/{id}`
    pub async fn history(&self, session_id: &str) -> ChatResult<HistoryResponse> {
        let response = self
            .client
            .get(format!("{}/chat/history/{}", self.base_url, session_id))
            .timeout(self.request_timeout)
            .send()
            .await?;

        Ok(ensure_success(response, "get history").await?.json().await?)
    }
}

async fn ensure_success(response: Response, action: &str) -> ChatResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    tracing::debug!("Failed to {}: {} - {}", action, status, text);
    Err(ChatError::Api {
        status: status.as_u16(),
        message: text,
    })
}
