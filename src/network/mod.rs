//! HTTP networking module
//!
//! Page fetching against content mirrors and JSON helpers for the mirror
//! directory and the remote classifier.

mod client;
mod user_agent;

pub use client::{FetchedPage, HttpClient, PageFetch};
pub use user_agent::generate_user_agent;
