//! HTTP Backend Implementation
//!
//! Talks to the course conversation service over plain HTTP.
//!
//! The reply to a conversation request is a chunked text body with no
//! content length and no end sentinel: the response is complete when the
//! server closes the body. This backend hands the body over chunk by chunk
//! and leaves decoding to the streaming engine.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use super::traits::{BackendError, ChunkStream, ConversationBackend, ConversationRequest};
use crate::catalogue::Course;
use crate::config::ClientConfig;
use crate::session::SessionId;

/// HTTP conversation backend client
#[derive(Clone)]
pub struct HttpBackend {
    /// Base URL without trailing slash
    base_url: String,
    /// Bound for the catalogue request
    request_timeout: Duration,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for `base_url` with default timeouts
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_timeouts(base_url, Duration::from_secs(10), Duration::from_secs(10))
    }

    /// Create from client configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self, BackendError> {
        Self::with_timeouts(
            config.base_url.clone(),
            config.connect_timeout,
            config.request_timeout,
        )
    }

    fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, BackendError> {
        // No overall timeout; the engine bounds first-byte and inter-chunk waits.
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| BackendError::Connect(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
            http_client,
        })
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get courses endpoint URL
    fn courses_url(&self) -> String {
        format!("{}/courses", self.base_url)
    }

    /// Get conversation endpoint URL for a session
    fn conversation_url(&self, session_id: &SessionId) -> String {
        format!("{}/conv/{}", self.base_url, session_id)
    }

    /// Turn a non-success response into a [`BackendError::Status`]
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ConversationBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn fetch_courses(&self) -> Result<Vec<Course>, BackendError> {
        let url = self.courses_url();
        tracing::debug!(url = %url, "Fetching course catalogue");

        let response = self
            .http_client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| BackendError::Connect(e.to_string()))?;

        let response = Self::check_status(response).await?;

        response
            .json::<Vec<Course>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn open_conversation(
        &self,
        session_id: &SessionId,
        request: &ConversationRequest,
    ) -> Result<ChunkStream, BackendError> {
        let url = self.conversation_url(session_id);
        tracing::debug!(url = %url, bytes = request.message.len(), "Opening conversation stream");

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Connect(e.to_string()))?;

        let response = Self::check_status(response).await?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| BackendError::Transport(e.to_string())));

        Ok(stream.boxed())
    }
}
