//! Message domain models.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::account::AccountId;

/// Counterpart used when a message carries no usable address.
pub const UNKNOWN_COUNTERPART: &str = "unknown";

/// Unique identifier for a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl MessageId {
    /// Create a new message ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the exchange a message sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Mail addressed to the account owner.
    #[default]
    Received,
    /// Mail the account owner sent.
    Sent,
}

impl Direction {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sent" => Self::Sent,
            _ => Self::Received,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Sent => "sent",
        }
    }
}

/// Mailbox folder a message lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    /// Incoming mail.
    #[default]
    Inbox,
    /// Mail the owner sent.
    Sent,
    /// Mail classified as spam.
    Spam,
    /// Soft-deleted mail, recoverable until purged.
    Trash,
    /// Mail set aside out of the inbox.
    Archive,
}

impl Folder {
    /// Every folder, in display order.
    pub const ALL: [Self; 5] = [Self::Inbox, Self::Sent, Self::Spam, Self::Trash, Self::Archive];

    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        Self::from_name(s).unwrap_or_default()
    }

    /// Strict parse for boundary input.
    #[must_use]
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "inbox" => Some(Self::Inbox),
            "sent" => Some(Self::Sent),
            "spam" => Some(Self::Spam),
            "trash" => Some(Self::Trash),
            "archive" => Some(Self::Archive),
            _ => None,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
            Self::Spam => "spam",
            Self::Trash => "trash",
            Self::Archive => "archive",
        }
    }

    /// Human-readable display name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Inbox => "Inbox",
            Self::Sent => "Sent",
            Self::Spam => "Spam",
            Self::Trash => "Trash",
            Self::Archive => "Archive",
        }
    }
}

/// Attachment metadata carried on a message.
///
/// Only metadata is stored; the locator points at the payload in
/// whatever blob store the ingestion side uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Original file name.
    pub filename: String,
    /// MIME type as reported by the source.
    pub mime_type: String,
    /// Payload size in bytes.
    pub size_bytes: u64,
    /// Storage key or URL of the payload.
    pub locator: String,
}

/// A stored email message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Database ID, also the pagination key.
    pub id: MessageId,
    /// Account this message belongs to.
    pub account_id: AccountId,
    /// Source system identifier, unique per account.
    pub external_ref: String,
    /// Address this message files under, lowercase.
    pub counterpart: String,
    /// Which side of the exchange this message sits on.
    pub direction: Direction,
    /// Folder the message lives in.
    pub folder: Folder,
    /// Sender address.
    pub from_address: String,
    /// Recipient addresses.
    pub to_addresses: Vec<String>,
    /// CC addresses.
    pub cc_addresses: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Raw HTML body as received.
    pub body_html: String,
    /// Plain text derived from the body at ingest time.
    pub body_text: String,
    /// Short single-line preview derived at ingest time.
    pub snippet: String,
    /// Whether the owner has read the message.
    pub is_read: bool,
    /// Whether the owner flagged the message.
    pub is_flagged: bool,
    /// Attachment metadata.
    pub attachments: Vec<Attachment>,
    /// Optional origin country tag from the source system.
    pub country: Option<String>,
    /// Optional lead status tag from the source system.
    pub lead_status: Option<String>,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Whether the message carries at least one attachment.
    #[must_use]
    pub fn has_attachment(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// A message as handed to the store by the ingestion side.
///
/// Derived columns (counterpart, body text, snippet) are computed
/// during ingest, so they never appear here. Deserializes from the
/// ingestion JSON shape; only `externalRef` and `sentAt` are
/// mandatory there.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    /// Source system identifier, unique per account. Re-ingesting the
    /// same ref updates the stored row instead of duplicating it.
    pub external_ref: String,
    /// Which side of the exchange this message sits on.
    #[serde(default)]
    pub direction: Direction,
    /// Folder the message lands in.
    #[serde(default)]
    pub folder: Folder,
    /// Sender address.
    #[serde(default)]
    pub from_address: String,
    /// Recipient addresses.
    #[serde(default)]
    pub to_addresses: Vec<String>,
    /// CC addresses.
    #[serde(default)]
    pub cc_addresses: Vec<String>,
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// Raw HTML body.
    #[serde(default)]
    pub body_html: String,
    /// Whether the message arrives already read.
    #[serde(default)]
    pub is_read: bool,
    /// Whether the message arrives flagged.
    #[serde(default)]
    pub is_flagged: bool,
    /// Attachment metadata.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Optional origin country tag.
    #[serde(default)]
    pub country: Option<String>,
    /// Optional lead status tag.
    #[serde(default)]
    pub lead_status: Option<String>,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
}

impl NewMessage {
    /// Create a received message landing in the inbox.
    #[must_use]
    pub fn received(external_ref: &str, from_address: &str, sent_at: DateTime<Utc>) -> Self {
        Self {
            external_ref: external_ref.to_string(),
            direction: Direction::Received,
            folder: Folder::Inbox,
            from_address: from_address.to_string(),
            to_addresses: Vec::new(),
            cc_addresses: Vec::new(),
            subject: String::new(),
            body_html: String::new(),
            is_read: false,
            is_flagged: false,
            attachments: Vec::new(),
            country: None,
            lead_status: None,
            sent_at,
        }
    }

    /// Create a sent message landing in the sent folder.
    #[must_use]
    pub fn sent(external_ref: &str, to_address: &str, sent_at: DateTime<Utc>) -> Self {
        Self {
            external_ref: external_ref.to_string(),
            direction: Direction::Sent,
            folder: Folder::Sent,
            from_address: String::new(),
            to_addresses: vec![to_address.to_string()],
            cc_addresses: Vec::new(),
            subject: String::new(),
            body_html: String::new(),
            is_read: true,
            is_flagged: false,
            attachments: Vec::new(),
            country: None,
            lead_status: None,
            sent_at,
        }
    }

    /// Address this message files under.
    ///
    /// Received mail groups under its sender. Sent mail groups under
    /// the first recipient that is not the owner, falling back to the
    /// first recipient, so replies land in the conversation of the
    /// mail they answer. Addresses compare case-insensitively and the
    /// result is lowercase. A message with no usable address files
    /// under [`UNKNOWN_COUNTERPART`].
    #[must_use]
    pub fn counterpart(&self, owner_email: &str) -> String {
        let owner = owner_email.trim();
        let candidate = match self.direction {
            Direction::Received => trimmed(&self.from_address),
            Direction::Sent => self
                .to_addresses
                .iter()
                .filter_map(|a| trimmed(a))
                .find(|a| !a.eq_ignore_ascii_case(owner))
                .or_else(|| self.to_addresses.iter().find_map(|a| trimmed(a))),
        };
        candidate.map_or_else(|| UNKNOWN_COUNTERPART.to_string(), str::to_lowercase)
    }
}

/// Counts summarizing one account's mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxStats {
    /// Messages outside the trash.
    pub total: u64,
    /// Unread messages outside the trash.
    pub unread: u64,
    /// Messages in the spam folder.
    pub spam: u64,
    /// Messages outside the trash carrying attachments.
    pub with_attachments: u64,
}

/// Formats a timestamp for storage.
///
/// Fixed-width UTC RFC 3339, so lexicographic order in SQL matches
/// chronological order.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp, falling back to the epoch on bad data
/// rather than dropping the row.
pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(
        |_| {
            warn!("Unparseable timestamp in store: {s}");
            DateTime::UNIX_EPOCH
        },
        |ts| ts.with_timezone(&Utc),
    )
}

fn trimmed(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}
