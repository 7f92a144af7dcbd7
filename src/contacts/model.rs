//! Contact model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contact in the directory, keyed by its channel-scoped recipient id.
///
/// The id is immutable once created. Engagement attributes (`points`,
/// `tags`) are mutated only by directory operations — the campaign
/// dispatcher reads them but never writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    /// Channel-scoped recipient identifier (unique).
    pub id: String,
    /// Display name, updated from inbound-message hints.
    pub display_name: String,
    /// Engagement points.
    pub points: u32,
    /// Segment tags.
    pub tags: Vec<String>,
    /// When the contact last messaged us.
    pub last_contact_at: DateTime<Utc>,
    /// Recent inbound messages, newest last. Bounded — oldest entries
    /// are pruned on append.
    pub history: Vec<HistoryEntry>,
    /// When the contact was first seen.
    pub created_at: DateTime<Utc>,
}

/// One entry of a contact's message-history excerpt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub text: String,
}

impl Contact {
    /// Create a fresh contact from its first inbound message.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            display_name: display_name.into(),
            points: 0,
            tags: Vec::new(),
            last_contact_at: now,
            history: Vec::new(),
            created_at: now,
        }
    }

    /// Check whether the contact carries a tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// First whitespace-separated token of the display name, if any.
    pub fn first_name(&self) -> Option<&str> {
        self.display_name.split_whitespace().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_contact_starts_unengaged() {
        let c = Contact::new("5511999990000", "Maria Silva");
        assert_eq!(c.points, 0);
        assert!(c.tags.is_empty());
        assert!(c.history.is_empty());
    }

    #[test]
    fn first_name_token() {
        let c = Contact::new("1", "Maria Silva");
        assert_eq!(c.first_name(), Some("Maria"));

        let anon = Contact::new("2", "");
        assert_eq!(anon.first_name(), None);
    }

    #[test]
    fn has_tag() {
        let mut c = Contact::new("1", "Maria");
        c.tags.push("vip".into());
        assert!(c.has_tag("vip"));
        assert!(!c.has_tag("churned"));
    }
}
