//! Conversation aggregation.

mod aggregator;
mod model;

pub use aggregator::ConversationAggregator;
pub use model::{Conversation, ConversationSort, exchange_folders};
