//! Account identity and lookup.

mod directory;
mod model;

pub use directory::AccountDirectory;
pub use model::{AccountId, MailAccount};
