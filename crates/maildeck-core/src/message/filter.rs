//! Row-level message filters.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use super::model::{Folder, format_timestamp};

/// Filters narrowing a message query.
///
/// Every set field must match. Substring fields match ASCII
/// case-insensitively via `LIKE`; tag fields compare exactly. An
/// empty filter matches everything in scope.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Counterpart address equals this value.
    pub counterpart: Option<String>,
    /// Restrict to these folders; empty means any folder.
    pub folders: Vec<Folder>,
    /// Sender address contains this text.
    pub sender_contains: Option<String>,
    /// A recipient or CC address contains this text.
    pub recipient_contains: Option<String>,
    /// Subject contains this text.
    pub subject_contains: Option<String>,
    /// Sent at or after this instant.
    pub sent_after: Option<DateTime<Utc>>,
    /// Sent at or before this instant.
    pub sent_before: Option<DateTime<Utc>>,
    /// Match on read state.
    pub is_read: Option<bool>,
    /// Match on flag state.
    pub is_flagged: Option<bool>,
    /// Match on attachment presence.
    pub has_attachment: Option<bool>,
    /// Origin country tag equals this value.
    pub country: Option<String>,
    /// Lead status tag equals this value.
    pub lead_status: Option<String>,
}

impl MessageFilter {
    /// Appends an `AND` clause per set field.
    ///
    /// The query must already be inside a `WHERE` over the messages
    /// table, with column names unqualified.
    pub(crate) fn apply(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(counterpart) = &self.counterpart {
            qb.push(" AND counterpart = ");
            qb.push_bind(counterpart.to_lowercase());
        }
        if !self.folders.is_empty() {
            qb.push(" AND folder IN (");
            let mut separated = qb.separated(", ");
            for folder in &self.folders {
                separated.push_bind(folder.as_str());
            }
            qb.push(")");
        }
        if let Some(term) = &self.sender_contains {
            qb.push(" AND from_address LIKE ");
            qb.push_bind(like_contains(term));
            qb.push(" ESCAPE '\\'");
        }
        if let Some(term) = &self.recipient_contains {
            qb.push(" AND (to_addresses LIKE ");
            qb.push_bind(like_contains(term));
            qb.push(" ESCAPE '\\' OR cc_addresses LIKE ");
            qb.push_bind(like_contains(term));
            qb.push(" ESCAPE '\\')");
        }
        if let Some(term) = &self.subject_contains {
            qb.push(" AND subject LIKE ");
            qb.push_bind(like_contains(term));
            qb.push(" ESCAPE '\\'");
        }
        if let Some(after) = self.sent_after {
            qb.push(" AND sent_at >= ");
            qb.push_bind(format_timestamp(after));
        }
        if let Some(before) = self.sent_before {
            qb.push(" AND sent_at <= ");
            qb.push_bind(format_timestamp(before));
        }
        if let Some(is_read) = self.is_read {
            qb.push(" AND is_read = ");
            qb.push_bind(i64::from(is_read));
        }
        if let Some(is_flagged) = self.is_flagged {
            qb.push(" AND is_flagged = ");
            qb.push_bind(i64::from(is_flagged));
        }
        if let Some(has_attachment) = self.has_attachment {
            qb.push(" AND has_attachment = ");
            qb.push_bind(i64::from(has_attachment));
        }
        if let Some(country) = &self.country {
            qb.push(" AND country = ");
            qb.push_bind(country.clone());
        }
        if let Some(lead_status) = &self.lead_status {
            qb.push(" AND lead_status = ");
            qb.push_bind(lead_status.clone());
        }
    }
}

/// Builds a `%term%` pattern with LIKE metacharacters escaped.
///
/// Queries using the pattern must declare `ESCAPE '\'`.
pub(crate) fn like_contains(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
