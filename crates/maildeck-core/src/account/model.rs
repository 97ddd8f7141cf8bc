//! Account domain models.

use serde::{Deserialize, Serialize};

/// Unique identifier for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl AccountId {
    /// Create a new account ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An email account whose mailbox Maildeck manages.
///
/// The owner address decides which side of a message is its
/// counterpart: received mail groups under the sender, sent mail
/// under its first recipient that is not the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailAccount {
    /// Database ID, `None` until saved.
    pub id: Option<AccountId>,
    /// Owner address, normalized to lowercase.
    pub email: String,
    /// Name shown in account pickers.
    pub display_name: String,
}

impl MailAccount {
    /// Create an account for the given owner address.
    #[must_use]
    pub fn with_email(email: &str) -> Self {
        Self {
            id: None,
            email: email.to_lowercase(),
            display_name: String::new(),
        }
    }
}
