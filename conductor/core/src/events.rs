//! Surface Events
//!
//! Events sent from UI surfaces to the Conductor. A surface reports what the
//! user did (picked a course, pressed Enter, toggled a sort filter) and the
//! Conductor decides what that means.

use serde::{Deserialize, Serialize};

use crate::catalogue::{Course, SortKey};
use crate::messages::EventId;

/// Events from UI Surface to Conductor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SurfaceEvent {
    // ============================================
    // Connection Events
    // ============================================
    /// Surface connected to Conductor
    Connected {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// Surface type identifier
        surface_type: SurfaceType,
    },

    /// Surface disconnecting gracefully
    Disconnected {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// Reason for disconnect (optional)
        reason: Option<String>,
    },

    // ============================================
    // Catalogue Events
    // ============================================
    /// User asked to learn more about a course
    ///
    /// Carries the course itself rather than a list position, so a stale
    /// view can never resolve to a different course.
    CourseSelected {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// The selected course
        course: Course,
    },

    /// User toggled one of the sort filters
    SortToggled {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// Which filter
        key: SortKey,
    },

    // ============================================
    // User Input Events
    // ============================================
    /// User submitted free text
    TextSubmitted {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// The text as typed
        content: String,
        /// How the submission was triggered
        trigger: SubmitTrigger,
    },

    /// User asked to abort the in-flight response
    CancelRequested {
        /// Event ID for acknowledgment
        event_id: EventId,
    },

    // ============================================
    // Lifecycle Events
    // ============================================
    /// User requested quit
    QuitRequested {
        /// Event ID for acknowledgment
        event_id: EventId,
    },
}

impl SurfaceEvent {
    /// Generate a new event ID for this event
    pub fn new_event_id() -> EventId {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        EventId(format!("evt_{id}"))
    }

    /// Get the event ID
    pub fn event_id(&self) -> &EventId {
        match self {
            Self::Connected { event_id, .. }
            | Self::Disconnected { event_id, .. }
            | Self::CourseSelected { event_id, .. }
            | Self::SortToggled { event_id, .. }
            | Self::TextSubmitted { event_id, .. }
            | Self::CancelRequested { event_id }
            | Self::QuitRequested { event_id } => event_id,
        }
    }
}

/// Type of UI surface
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceType {
    /// Line-oriented terminal
    Terminal,
    /// Web browser UI
    Web,
    /// Headless (for testing/automation)
    Headless,
    /// Custom surface type
    Custom(String),
}

impl SurfaceType {
    /// Human-readable name
    pub fn name(&self) -> &str {
        match self {
            Self::Terminal => "Terminal",
            Self::Web => "Web",
            Self::Headless => "Headless",
            Self::Custom(name) => name,
        }
    }
}

/// How a free-text submission was triggered
///
/// Both triggers are handled identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitTrigger {
    /// The send button
    SendButton,
    /// Enter pressed in the input field
    EnterKey,
}
