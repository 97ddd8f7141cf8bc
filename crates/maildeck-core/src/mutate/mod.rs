//! Message state mutations.

mod model;
mod mutator;

pub use model::{BulkOutcome, MessageSelector};
pub use mutator::StateMutator;
