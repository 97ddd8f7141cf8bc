//! Typed service facade and response envelopes.

mod mailbox;
mod response;

pub use mailbox::{MailboxService, ServiceConfig};
pub use response::{ListResponse, MutationResponse, StatsResponse};
