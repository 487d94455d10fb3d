//! Temporal search orchestration
//!
//! Partitions a date range into windows, retrieves and classifies items
//! per window, and terminates on the earliest qualifying source while
//! optionally collecting the earliest-k buffer.

mod finder;
mod models;

pub use finder::{SearchError, SearchOptions, SourceFinder};
pub use models::*;
