//! Conductor Messages
//!
//! Messages sent from the Conductor to UI surfaces. These represent all the ways
//! the conversation core can tell a surface (terminal, browser, test harness)
//! what to display.
//!
//! # Design Philosophy
//!
//! Surfaces are pure renderers. They keep no conversation state of their own
//! beyond what these messages tell them: the transient streaming view, the
//! committed transcript entries, the course list and the status area.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalogue::{Course, SortState};
use crate::session::SessionId;
use crate::transcript::{ScrollAnchor, ScrollBehavior};

/// Messages from Conductor to UI Surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ConductorMessage {
    // ============================================
    // Conversation Messages
    // ============================================
    /// A committed transcript entry to display
    Message {
        /// Unique message ID for tracking
        id: MessageId,
        /// Who sent this message
        role: MessageRole,
        /// The message content (plain text for users, HTML for the assistant)
        content: String,
        /// Content type hint for rendering
        #[serde(default)]
        content_type: ContentType,
    },

    /// Response headers arrived: attach the transient streaming view
    StreamStarted {
        /// Message ID reserved for the response
        message_id: MessageId,
    },

    /// Decoded text from the response body, in arrival order
    Token {
        /// Message ID this text belongs to
        message_id: MessageId,
        /// The decoded text
        text: String,
    },

    /// Stream has completed: remove the transient view
    ///
    /// The rendered entry follows as a [`ConductorMessage::Message`].
    StreamEnd {
        /// Message ID that completed
        message_id: MessageId,
    },

    /// Stream failed; nothing was committed
    StreamError {
        /// Message ID that errored
        message_id: MessageId,
        /// Error description
        error: String,
    },

    /// Stream was cancelled by the user; nothing was committed
    StreamCancelled {
        /// Message ID that was cancelled
        message_id: MessageId,
    },

    // ============================================
    // Catalogue
    // ============================================
    /// The course list in its current display order
    Catalogue {
        /// Courses in display order
        courses: Vec<Course>,
        /// Active sort filters
        sort: SortState,
    },

    // ============================================
    // Layout Directives
    // ============================================
    /// Layout hint for surface UI organization
    LayoutHint {
        /// The layout directive to apply
        directive: LayoutDirective,
    },

    /// Whether the free-text input may be used right now
    InputAvailability {
        /// True if the surface should accept free text
        enabled: bool,
    },

    // ============================================
    // System Messages
    // ============================================
    /// Status-area notification
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Title (optional)
        title: Option<String>,
        /// Message content
        message: String,
    },

    /// Conductor state change
    State {
        /// The new state
        state: ConductorState,
    },

    /// Session information
    SessionInfo {
        /// Session ID every request is scoped by
        session_id: SessionId,
        /// Backend base URL
        base_url: String,
    },

    /// Acknowledgment of received event
    Ack {
        /// Event ID being acknowledged
        event_id: EventId,
    },

    /// Request surface to quit
    Quit {
        /// Optional goodbye message
        message: Option<String>,
    },
}

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event identifier (for acks)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    /// User input
    User,
    /// Remote assistant
    Assistant,
}

/// Content type hints for message rendering
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ContentType {
    /// Plain text, must be escaped by the surface
    #[default]
    Plain,
    /// Rendered HTML, already safe for insertion
    Html,
}

/// Layout directives for controlling UI surface organization
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LayoutDirective {
    /// Bring the chat area into view
    FocusChat,
    /// Clear the free-text input field
    ClearInput,
    /// Scroll the discussion area to a committed entry
    ScrollTo {
        /// Entry to scroll to
        message_id: MessageId,
        /// Which part of the entry must be visible
        anchor: ScrollAnchor,
        /// Animation style
        behavior: ScrollBehavior,
    },
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

/// Conductor operational states
///
/// A request moves `Idle → Sending → Streaming → Finalizing → Idle`;
/// `Error` is reachable from `Sending` and `Streaming` and always falls
/// back to `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConductorState {
    /// Starting up, catalogue not loaded yet
    Initializing,
    /// No request outstanding
    Idle,
    /// Request issued, waiting for response headers
    Sending,
    /// Response body is arriving
    Streaming,
    /// Rendering and committing the completed response
    Finalizing,
    /// The request failed
    Error,
    /// Shutting down
    ShuttingDown,
}

impl ConductorState {
    /// Whether a request is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Sending | Self::Streaming | Self::Finalizing)
    }
}
