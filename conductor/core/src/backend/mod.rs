//! Conversation Backend Integration
//!
//! Abstracted access to the remote service that serves the course catalogue
//! and streams conversation replies. The Conductor only ever talks to the
//! [`ConversationBackend`] trait; [`HttpBackend`] is the real implementation.
//!
//! # Endpoints
//!
//! - `GET {base}/courses` - JSON array of courses
//! - `POST {base}/conv/{session_id}` - body `{"message": ...}`, chunked text reply
//!
//! # Usage
//!
//! ```ignore
//! use coursechat_core::backend::{ConversationBackend, ConversationRequest, HttpBackend};
//! use coursechat_core::SessionId;
//!
//! let backend = HttpBackend::new("http://localhost:5000")?;
//! let request = ConversationRequest::new("Hello!");
//! let stream = backend.open_conversation(&SessionId::current(), &request).await?;
//! ```

mod http;
mod traits;

pub use http::HttpBackend;
pub use traits::{BackendError, ChunkStream, ConversationBackend, ConversationRequest, TimeoutPhase};
