//! # maildeck-core
//!
//! Core inbox logic for Maildeck.
//!
//! This crate turns a flat store of email messages into the views an
//! inbox client needs:
//! - **Conversation aggregation** - one row per counterpart address,
//!   with exact unread and message counts
//! - **Cursor pagination** - stable keyset paging over conversations,
//!   messages, and search results
//! - **Search** - substring search over subject, sender, and body
//!   text, deduplicated to one hit per conversation
//! - **Thread grouping** - consecutive same-sender runs for the
//!   reading pane
//! - **Bulk mutations** - mark read, flag, move, and delete with
//!   per-id failure reporting
//! - **Service facade** - typed entry points returning JSON-ready
//!   response envelopes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod conversation;
mod error;
pub mod message;
pub mod mutate;
pub mod page;
pub mod search;
pub mod service;
pub mod thread;

pub use account::{AccountDirectory, AccountId, MailAccount};
pub use conversation::{Conversation, ConversationAggregator, ConversationSort, exchange_folders};
pub use error::{Error, Result};
pub use message::{
    Attachment, Direction, Folder, MailboxStats, Message, MessageFilter, MessageId, MessageStore,
    NewMessage,
};
pub use mutate::{BulkOutcome, MessageSelector, StateMutator};
pub use page::{Cursor, Page, PageRequest};
pub use search::{SearchEngine, SearchFilter, SearchHit, SearchQuery};
pub use service::{ListResponse, MailboxService, MutationResponse, ServiceConfig, StatsResponse};
pub use thread::{ThreadGroup, group_by_sender};
