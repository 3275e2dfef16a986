mod indexer;
mod types;

pub use indexer::*;
pub use types::*;
