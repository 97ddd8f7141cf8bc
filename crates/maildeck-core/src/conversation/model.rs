//! Conversation domain models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::account::AccountId;
use crate::message::{Folder, MessageId};
use crate::page::Cursor;

/// One counterpart's exchange within a folder.
///
/// Conversations are derived at read time from the messages grouped
/// by `(account, counterpart, folder)`; nothing is materialized, so
/// every count is exact at the moment of the query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Account the conversation belongs to.
    pub account_id: AccountId,
    /// Address the messages group under, lowercase.
    pub counterpart: String,
    /// Folder this view of the exchange lives in.
    pub folder: Folder,
    /// Subject of the newest member message.
    pub subject: String,
    /// Snippet of the newest member message.
    pub last_body_preview: String,
    /// When the newest member was sent.
    pub last_message_at: DateTime<Utc>,
    /// ID of the newest member, doubles as the pagination cursor.
    pub last_message_id: MessageId,
    /// Messages in the group.
    pub message_count: u64,
    /// Unread messages in the group.
    pub unread_count: u64,
    /// Whether any member carries an attachment.
    pub has_attachment: bool,
}

impl Conversation {
    /// Pagination cursor for this conversation.
    #[must_use]
    pub const fn cursor(&self) -> Cursor {
        Cursor::new(self.last_message_id.0)
    }
}

/// Orderings for the conversation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationSort {
    /// Newest activity first.
    #[default]
    Recent,
    /// Most unread first, newest activity breaking ties.
    Unread,
    /// Counterpart address, A to Z.
    Sender,
}

impl ConversationSort {
    /// Parse from query string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "unread" => Self::Unread,
            "sender" => Self::Sender,
            _ => Self::Recent,
        }
    }

    /// Convert to query string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Unread => "unread",
            Self::Sender => "sender",
        }
    }
}

/// Folders shown when a conversation is opened from `folder`.
///
/// The reading pane interleaves both sides of the exchange, so inbox,
/// archive, and sent conversations expand to all three. Spam keeps
/// the owner's replies visible next to the spam itself; trash shows
/// only trashed mail.
#[must_use]
pub const fn exchange_folders(folder: Folder) -> &'static [Folder] {
    match folder {
        Folder::Inbox | Folder::Sent | Folder::Archive => {
            &[Folder::Inbox, Folder::Sent, Folder::Archive]
        }
        Folder::Spam => &[Folder::Spam, Folder::Sent],
        Folder::Trash => &[Folder::Trash],
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn sort_roundtrip() {
        for sort in [
            ConversationSort::Recent,
            ConversationSort::Unread,
            ConversationSort::Sender,
        ] {
            assert_eq!(ConversationSort::parse(sort.as_str()), sort);
        }
        assert_eq!(ConversationSort::parse("bogus"), ConversationSort::Recent);
    }

    #[test]
    fn trash_conversations_stay_in_trash() {
        assert_eq!(exchange_folders(Folder::Trash), &[Folder::Trash]);
        assert!(exchange_folders(Folder::Inbox).contains(&Folder::Sent));
        assert!(!exchange_folders(Folder::Spam).contains(&Folder::Inbox));
    }
}
