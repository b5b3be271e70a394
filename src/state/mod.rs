//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `QueryState`: the in-memory lifecycle of a single query (pending, running, done, failed)
//! - `CrawlProgress`: the durable record of terminal query outcomes that drives resumption

mod progress;
mod query_state;

// Re-export main types
pub use progress::{CrawlProgress, FailedEntry};
pub use query_state::QueryState;
