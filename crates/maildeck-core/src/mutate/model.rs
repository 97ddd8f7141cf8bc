//! Mutation domain models.

use serde::Serialize;

use crate::message::MessageId;

/// What a state mutation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSelector {
    /// A single message.
    Id(MessageId),
    /// Every member of one conversation, named by its counterpart
    /// address. Matching is case-insensitive.
    Conversation(String),
}

impl MessageSelector {
    /// Select one conversation by counterpart address.
    #[must_use]
    pub fn conversation(counterpart: impl Into<String>) -> Self {
        Self::Conversation(counterpart.into())
    }
}

/// Per-batch result of a bulk state mutation.
///
/// Bulk operations never abort on bad input: ids that could not be
/// applied land in `failed_ids` while the rest of the batch goes
/// through. Callers reconcile optimistic state from this report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    /// How many messages the mutation matched. Repeating an
    /// idempotent mutation reports the same count.
    pub updated_count: usize,
    /// Ids the mutation could not be applied to, in request order.
    pub failed_ids: Vec<MessageId>,
}

impl BulkOutcome {
    /// An outcome where every targeted message was matched.
    #[must_use]
    pub const fn complete(updated_count: usize) -> Self {
        Self {
            updated_count,
            failed_ids: Vec::new(),
        }
    }

    /// An outcome where a single targeted message was missed.
    #[must_use]
    pub fn missed(id: MessageId) -> Self {
        Self {
            updated_count: 0,
            failed_ids: vec![id],
        }
    }

    /// Whether every targeted message was matched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_ids.is_empty()
    }
}
