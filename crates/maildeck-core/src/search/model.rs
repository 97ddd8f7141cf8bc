//! Search domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{Folder, MessageId};
use crate::page::Cursor;

/// Shortest query that triggers a search, in characters after
/// trimming. Anything shorter returns an empty result without
/// touching the store.
pub const MIN_QUERY_CHARS: usize = 2;

/// Restricts which messages count as search matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFilter {
    /// Every message in scope.
    #[default]
    All,
    /// Unread messages only.
    Unread,
    /// Messages carrying at least one attachment.
    #[serde(rename = "with-attachments")]
    WithAttachments,
}

impl SearchFilter {
    /// Parse from string representation, defaulting to [`Self::All`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "unread" => Self::Unread,
            "with-attachments" | "attachments" => Self::WithAttachments,
            _ => Self::All,
        }
    }

    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Unread => "unread",
            Self::WithAttachments => "with-attachments",
        }
    }
}

/// A search request: free text plus an optional match restriction.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Raw query text; matched as a case-insensitive substring of the
    /// subject, sender address, and body text.
    pub text: String,
    /// Which messages count as matches.
    pub filter: SearchFilter,
}

impl SearchQuery {
    /// Create a query matching every message containing `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filter: SearchFilter::All,
        }
    }

    /// Restrict matches to `filter`.
    #[must_use]
    pub const fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Query text with surrounding whitespace removed.
    #[must_use]
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Whether the query is long enough to run.
    #[must_use]
    pub fn is_searchable(&self) -> bool {
        self.trimmed().chars().count() >= MIN_QUERY_CHARS
    }
}

/// One search result, covering every match in one conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Conversation the matches belong to.
    pub counterpart: String,
    /// Newest matching message, shown as the hit.
    pub matched_message_id: MessageId,
    /// Folder of the newest matching message.
    pub folder: Folder,
    /// Subject of the newest matching message.
    pub subject: String,
    /// Preview of the newest matching message.
    pub snippet: String,
    /// When the newest matching message was sent.
    pub matched_at: DateTime<Utc>,
    /// How many messages in the conversation matched.
    pub match_count: u64,
}

impl SearchHit {
    /// Pagination cursor for this hit.
    #[must_use]
    pub const fn cursor(&self) -> Cursor {
        Cursor::new(self.matched_message_id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_roundtrip() {
        for filter in [
            SearchFilter::All,
            SearchFilter::Unread,
            SearchFilter::WithAttachments,
        ] {
            assert_eq!(SearchFilter::parse(filter.as_str()), filter);
        }
        assert_eq!(SearchFilter::parse("anything else"), SearchFilter::All);
    }

    #[test]
    fn query_length_counts_trimmed_chars() {
        assert!(!SearchQuery::new("").is_searchable());
        assert!(!SearchQuery::new("a").is_searchable());
        assert!(!SearchQuery::new("  a  ").is_searchable());
        assert!(SearchQuery::new(" ab ").is_searchable());
        assert!(!SearchQuery::new("\u{1f980}").is_searchable());
        assert!(SearchQuery::new("\u{1f980}\u{1f980}").is_searchable());
    }
}
