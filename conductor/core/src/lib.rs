//! Course Chat Core - Headless Conversation Orchestration
//!
//! This crate holds everything a course-chat client does apart from drawing
//! pixels: fetching the course catalogue, framing questions, streaming the
//! reply from the conversation service, rendering it to HTML and keeping the
//! transcript. It can drive a terminal, a browser bridge or a test harness.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          UI Surfaces                             │
//! │      ┌────────────┐    ┌─────────────┐    ┌───────────────┐      │
//! │      │  Terminal  │    │ Web bridge  │    │   Headless    │      │
//! │      └─────┬──────┘    └──────┬──────┘    └───────┬───────┘      │
//! │            └──────────────────┼───────────────────┘              │
//! │                     SurfaceEvent (up)                            │
//! │                   ConductorMessage (down)                        │
//! └──────────────────────────────┼───────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────────┐
//! │                      COURSE CHAT CORE                            │
//! │  ┌───────────────────────────┴────────────────────────────────┐  │
//! │  │                        Conductor                           │  │
//! │  │ ┌───────────┐ ┌─────────┐ ┌──────────────┐ ┌────────────┐  │  │
//! │  │ │ Catalogue │ │  Input  │ │ StreamEngine │ │ Transcript │  │  │
//! │  │ └───────────┘ └─────────┘ └──────┬───────┘ └────────────┘  │  │
//! │  └──────────────────────────────────┼─────────────────────────┘  │
//! │                          ConversationBackend (HTTP)              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Conductor`]: owns the client state and reacts to surface events
//! - [`ConductorMessage`]: Messages sent from Conductor to UI surfaces
//! - [`SurfaceEvent`]: Events sent from UI surfaces to Conductor
//! - [`HttpBackend`]: the conversation service client
//! - [`StreamEngine`]: single-flight request with incremental decoding
//!
//! # Quick Start
//!
//! ```ignore
//! use coursechat_core::{ClientConfig, Conductor, HttpBackend, SurfaceEvent};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::from_env();
//!     let backend = HttpBackend::from_config(&config)?;
//!     let (tx, mut rx) = mpsc::channel(256);
//!
//!     let mut conductor = Conductor::new(backend, config, tx);
//!     conductor.start().await?;
//!
//!     let course = conductor.catalogue().view()?[0].clone();
//!     conductor
//!         .handle_event(SurfaceEvent::CourseSelected {
//!             event_id: SurfaceEvent::new_event_id(),
//!             course,
//!         })
//!         .await?;
//!     conductor.run_until_idle().await;
//!
//!     while let Ok(msg) = rx.try_recv() {
//!         // Render message to UI
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: conversation service abstraction and HTTP client
//! - [`catalogue`]: course list, caching and sort filters
//! - [`conductor`]: Main Conductor struct
//! - [`config`]: layered configuration (defaults, TOML, env, CLI)
//! - [`events`]: Events from UI surfaces to Conductor
//! - [`input`]: default-prompt vs. free-text framing
//! - [`messages`]: Messages from Conductor to UI surfaces
//! - [`render`]: markdown + math to HTML
//! - [`session`]: per-process session identity
//! - [`streaming`]: request task, timeouts, incremental decoding
//! - [`transcript`]: append-only discussion log and scroll rules
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on terminal or GUI libraries. It's
//! pure client logic that can be used anywhere.

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod catalogue;
pub mod conductor;
pub mod config;
pub mod events;
pub mod input;
pub mod messages;
pub mod render;
pub mod session;
pub mod streaming;
pub mod transcript;

// Re-exports for convenience
pub use backend::{
    BackendError, ChunkStream, ConversationBackend, ConversationRequest, HttpBackend,
    TimeoutPhase,
};
pub use catalogue::{Catalogue, CatalogueError, Course, FieldValue, SortKey, SortState};
pub use conductor::Conductor;
pub use events::{SubmitTrigger, SurfaceEvent, SurfaceType};
pub use input::{default_prompt, InputController, InputMode, InputRejection};
pub use messages::{
    ConductorMessage, ConductorState, ContentType, EventId, LayoutDirective, MessageId,
    MessageRole, NotifyLevel,
};
pub use render::{MarkdownRenderer, RichTextRenderer};
pub use session::SessionId;
pub use streaming::{
    CompletedStream, EngineError, EngineEvent, PendingStream, StreamEngine, StreamSignal,
    StreamTimeouts, Utf8StreamDecoder,
};
pub use transcript::{scroll_offset, ScrollAnchor, ScrollBehavior, Transcript, TranscriptEntry};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ClientConfig, ClientToml,
    ConfigError, ConfigOverrides, ConfigSource,
};
