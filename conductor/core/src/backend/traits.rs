//! Backend Traits
//!
//! Trait definitions for the conversation backend. This abstraction lets the
//! Conductor run against the real HTTP service or an in-memory script in
//! tests without changing core logic.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalogue::Course;
use crate::session::SessionId;

/// Raw response body, one item per received chunk
pub type ChunkStream = BoxStream<'static, Result<Bytes, BackendError>>;

/// Which wait ran out
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// Waiting for response headers
    Headers,
    /// Waiting for the first body chunk
    FirstChunk,
    /// Waiting between two body chunks
    BetweenChunks,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Headers => write!(f, "response headers"),
            Self::FirstChunk => write!(f, "first response chunk"),
            Self::BetweenChunks => write!(f, "next response chunk"),
        }
    }
}

/// Errors from the conversation backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request could not be sent (DNS, refused connection, ...)
    #[error("connection failed: {0}")]
    Connect(String),

    /// The server answered with a non-success status
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The response body broke off mid-stream
    #[error("stream interrupted: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("invalid response: {0}")]
    Decode(String),

    /// A bounded wait expired
    #[error("timed out after {}ms waiting for {phase}", .after.as_millis())]
    Timeout {
        /// Which wait expired
        phase: TimeoutPhase,
        /// The bound that was exceeded
        after: Duration,
    },
}

/// Body of a conversation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRequest {
    /// The framed message text
    pub message: String,
}

impl ConversationRequest {
    /// Create a request
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Conversation backend trait
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Get the backend name (for logs)
    fn name(&self) -> &str;

    /// Fetch the course catalogue
    async fn fetch_courses(&self) -> Result<Vec<Course>, BackendError>;

    /// Send a message and open the streamed reply
    ///
    /// Resolves once response headers arrive. The returned stream yields body
    /// chunks in arrival order and ends when the server closes the body.
    /// Dropping the stream releases the connection.
    async fn open_conversation(
        &self,
        session_id: &SessionId,
        request: &ConversationRequest,
    ) -> Result<ChunkStream, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = ConversationRequest::new("explain more");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "explain more" }));
    }

    #[test]
    fn test_timeout_message() {
        let err = BackendError::Timeout {
            phase: TimeoutPhase::BetweenChunks,
            after: Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 250ms waiting for next response chunk"
        );
    }
}
