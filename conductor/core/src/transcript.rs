//! Conversation Transcript
//!
//! The append-only history backing the visible discussion. Insertion order is
//! display order; entries are never edited or removed once committed.
//!
//! The transcript also decides where a surface should scroll after each
//! append: to the very bottom after a user entry, and to the start of the new
//! entry after an assistant entry (responses can be long, and the reader wants
//! to begin at the top of the answer).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::messages::{ContentType, MessageId, MessageRole};

/// A committed transcript entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscriptEntry {
    id: MessageId,
    role: MessageRole,
    content: String,
    content_type: ContentType,
    created_at: DateTime<Utc>,
}

impl TranscriptEntry {
    /// Unique message ID
    #[must_use]
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Who sent this entry
    #[must_use]
    pub fn role(&self) -> MessageRole {
        self.role
    }

    /// Entry content: plain text for users, rendered HTML for the assistant
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Content type hint
    #[must_use]
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// When the entry was committed
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Append-only ordered message log
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Create an empty transcript
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry under a fresh message ID
    pub fn append(&mut self, role: MessageRole, content: String) -> &TranscriptEntry {
        self.append_with_id(MessageId::new(), role, content)
    }

    /// Append an entry under an ID reserved earlier (streamed responses)
    pub fn append_with_id(
        &mut self,
        id: MessageId,
        role: MessageRole,
        content: String,
    ) -> &TranscriptEntry {
        let content_type = match role {
            MessageRole::User => ContentType::Plain,
            MessageRole::Assistant => ContentType::Html,
        };
        self.entries.push(TranscriptEntry {
            id,
            role,
            content,
            content_type,
            created_at: Utc::now(),
        });
        let index = self.entries.len() - 1;
        &self.entries[index]
    }

    /// All entries in display order
    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Look up an entry by ID
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&TranscriptEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// The most recent entry
    #[must_use]
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been committed yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which part of a freshly appended entry must end up visible
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollAnchor {
    /// Bottom of the discussion area
    Bottom,
    /// First line of the new entry
    EntryStart,
}

impl ScrollAnchor {
    /// Anchor used after appending an entry from `role`
    #[must_use]
    pub fn for_role(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Self::Bottom,
            MessageRole::Assistant => Self::EntryStart,
        }
    }
}

/// Scroll animation style
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollBehavior {
    /// Animated scroll
    #[default]
    Smooth,
    /// Jump immediately
    Instant,
}

/// Resolve a scroll directive to a top offset
///
/// `scroll_height` is the total scrollable height of the discussion area
/// after the append, `entry_height` the rendered height of the new entry.
#[must_use]
pub fn scroll_offset(anchor: ScrollAnchor, scroll_height: u32, entry_height: u32) -> u32 {
    match anchor {
        ScrollAnchor::Bottom => scroll_height,
        ScrollAnchor::EntryStart => scroll_height.saturating_sub(entry_height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut transcript = Transcript::new();
        transcript.append(MessageRole::User, "first".to_string());
        transcript.append(MessageRole::Assistant, "<p>second</p>".to_string());
        transcript.append(MessageRole::User, "third".to_string());

        let contents: Vec<&str> = transcript.entries().iter().map(|e| e.content()).collect();
        assert_eq!(contents, vec!["first", "<p>second</p>", "third"]);
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn test_content_type_follows_role() {
        let mut transcript = Transcript::new();
        let user = transcript.append(MessageRole::User, "hi".to_string());
        assert_eq!(user.content_type(), &ContentType::Plain);

        let assistant = transcript.append(MessageRole::Assistant, "<p>hi</p>".to_string());
        assert_eq!(assistant.content_type(), &ContentType::Html);
    }

    #[test]
    fn test_append_with_reserved_id() {
        let mut transcript = Transcript::new();
        let id = MessageId::new();
        transcript.append_with_id(id.clone(), MessageRole::Assistant, "<p>x</p>".to_string());

        assert_eq!(transcript.get(&id).map(TranscriptEntry::role), Some(MessageRole::Assistant));
        assert_eq!(transcript.last().map(TranscriptEntry::id), Some(&id));
    }

    #[test]
    fn test_scroll_anchor_for_role() {
        assert_eq!(ScrollAnchor::for_role(MessageRole::User), ScrollAnchor::Bottom);
        assert_eq!(
            ScrollAnchor::for_role(MessageRole::Assistant),
            ScrollAnchor::EntryStart
        );
    }

    #[test]
    fn test_scroll_offset() {
        assert_eq!(scroll_offset(ScrollAnchor::Bottom, 900, 300), 900);
        assert_eq!(scroll_offset(ScrollAnchor::EntryStart, 900, 300), 600);
        // An entry taller than the area still anchors at the top
        assert_eq!(scroll_offset(ScrollAnchor::EntryStart, 200, 300), 0);
    }
}
