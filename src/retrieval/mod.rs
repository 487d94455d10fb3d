//! Mirror retrieval module
//!
//! URL construction, page fetching and timeline parsing against a rotating
//! pool of interchangeable content mirrors.

mod client;
mod mirrors;
mod page;

pub use client::{RetrievalClient, SearchRequest, SearchWindow};
pub use mirrors::MirrorPool;
pub use page::{parse_page, Continuation, ParsedPage};
