//! Mailbox search.

mod engine;
mod model;

pub use engine::SearchEngine;
pub use model::{MIN_QUERY_CHARS, SearchFilter, SearchHit, SearchQuery};
