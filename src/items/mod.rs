//! Item types and the dataset contract
//!
//! This module defines the core value records produced by the retrieval layer.

mod dataset;
mod types;

pub use dataset::{read_dataset, DatasetWriter};
pub use types::*;
