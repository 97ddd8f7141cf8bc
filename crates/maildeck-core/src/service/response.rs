//! JSON-ready response envelopes.
//!
//! Every envelope serializes in camelCase so an HTTP binding can pass
//! it through verbatim. Failures become `success: false` plus a
//! message; the boundary never surfaces a raw error or panics.

use serde::Serialize;

use crate::Result;
use crate::message::{MailboxStats, MessageId};
use crate::mutate::BulkOutcome;
use crate::page::{Cursor, Page};

/// Envelope for paged list endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// Whether the call succeeded.
    pub success: bool,
    /// Items of the requested page, empty on failure.
    pub data: Vec<T>,
    /// Continuation token, `None` on the final page.
    pub next_cursor: Option<Cursor>,
    /// Whether another page exists.
    pub has_more: bool,
    /// Failure message when `success` is false.
    pub error: Option<String>,
}

impl<T> ListResponse<T> {
    /// Wrap a page result into the envelope.
    pub(crate) fn from_result(result: Result<Page<T>>) -> Self {
        match result {
            Ok(page) => Self {
                success: true,
                data: page.items,
                next_cursor: page.next_cursor,
                has_more: page.has_more,
                error: None,
            },
            Err(e) => Self {
                success: false,
                data: Vec::new(),
                next_cursor: None,
                has_more: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Envelope for state mutation endpoints.
///
/// Partial success is a success: ids the mutation missed are listed
/// in `failed_ids` while `success` stays true. Only validation and
/// store failures flip `success` to false.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    /// Whether the call itself succeeded.
    pub success: bool,
    /// How many messages the mutation matched.
    pub updated: usize,
    /// Ids the mutation could not be applied to.
    pub failed_ids: Vec<MessageId>,
    /// Failure message when `success` is false.
    pub error: Option<String>,
}

impl MutationResponse {
    /// Wrap a bulk outcome result into the envelope.
    pub(crate) fn from_result(result: Result<BulkOutcome>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                updated: outcome.updated_count,
                failed_ids: outcome.failed_ids,
                error: None,
            },
            Err(e) => Self {
                success: false,
                updated: 0,
                failed_ids: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Envelope for the mailbox stats endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Whether the call succeeded.
    pub success: bool,
    /// Mailbox counters, absent on failure.
    pub stats: Option<MailboxStats>,
    /// Failure message when `success` is false.
    pub error: Option<String>,
}

impl StatsResponse {
    /// Wrap a stats result into the envelope.
    pub(crate) fn from_result(result: Result<MailboxStats>) -> Self {
        match result {
            Ok(stats) => Self {
                success: true,
                stats: Some(stats),
                error: None,
            },
            Err(e) => Self {
                success: false,
                stats: None,
                error: Some(e.to_string()),
            },
        }
    }
}
