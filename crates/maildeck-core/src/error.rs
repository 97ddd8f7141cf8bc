//! Error types for the core library.

use thiserror::Error;

use crate::account::AccountId;
use crate::message::MessageId;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A request parameter was rejected before touching the store.
    #[error("Invalid {field}: {reason}")]
    Validation {
        /// Name of the rejected parameter.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Message not found.
    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),
}

impl Error {
    /// Builds a validation error for a named parameter.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
