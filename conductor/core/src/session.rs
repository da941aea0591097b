//! Session Identity
//!
//! One opaque identifier per client lifetime. Every conversation request is
//! scoped by it, so the backend can keep a single server-side context for
//! the whole run. Nothing is persisted: a new process is a new conversation.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh random session ID (UUID v4)
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The session ID for this process
    ///
    /// Generated on first call; every later call returns the same value.
    #[must_use]
    pub fn current() -> Self {
        static CURRENT: OnceLock<SessionId> = OnceLock::new();
        CURRENT.get_or_init(Self::generate).clone()
    }

    /// Borrow the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
