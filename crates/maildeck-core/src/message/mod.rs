//! Message storage and filtering.

mod filter;
mod model;
mod store;

pub use filter::MessageFilter;
pub use model::{
    Attachment, Direction, Folder, MailboxStats, Message, MessageId, NewMessage,
    UNKNOWN_COUNTERPART,
};
pub use store::MessageStore;

pub(crate) use filter::like_contains;
pub(crate) use model::{format_timestamp, parse_timestamp};
pub(crate) use store::{Anchor, overfetch};
