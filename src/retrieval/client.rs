//! Retrieval client
//!
//! Deterministic search URL construction, page fetches against the current
//! mirror, and timeline parsing. One client instance per search: the mirror
//! pointer it carries is the only state shared between a window's pages.

use super::mirrors::MirrorPool;
use super::page::{parse_page, ParsedPage};
use crate::network::{FetchedPage, PageFetch};
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

/// Half-open `[since, until)` date interval scanned by one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

impl SearchWindow {
    pub fn new(since: NaiveDate, until: NaiveDate) -> Self {
        Self { since, until }
    }

    /// Short form for log lines, e.g. "2019-01-01..2020-01-01".
    pub fn label(&self) -> String {
        format!("{}..{}", self.since, self.until)
    }
}

/// Query-level parameters that stay fixed while windows advance.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Boolean query expression
    pub query: String,
    /// Optional location hint
    pub near: String,
    /// Result categories to require, rendered as `&f-<name>=on`
    pub includes: Vec<String>,
    /// Result categories to exclude, rendered as `&e-<name>=on`
    pub excludes: Vec<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    pub fn with_includes(mut self, includes: Vec<String>) -> Self {
        self.includes = includes;
        self
    }

    pub fn with_near(mut self, near: impl Into<String>) -> Self {
        self.near = near.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty()
    }
}

/// Client for one search: a page fetcher plus the mirror pool it rotates.
pub struct RetrievalClient {
    fetcher: Arc<dyn PageFetch>,
    pool: MirrorPool,
}

impl RetrievalClient {
    pub fn new(fetcher: Arc<dyn PageFetch>, pool: MirrorPool) -> Self {
        Self { fetcher, pool }
    }

    /// Deterministic mirror-relative search path. Free-text fields are
    /// percent-encoded; filter flags keep the insertion order of the
    /// request's include/exclude lists.
    pub fn search_path(request: &SearchRequest, window: &SearchWindow) -> String {
        let mut path = format!(
            "/search?f=tweets&q={}&since={}&until={}&near={}",
            urlencoding::encode(&request.query),
            window.since.format("%Y-%m-%d"),
            window.until.format("%Y-%m-%d"),
            urlencoding::encode(&request.near),
        );
        for name in &request.includes {
            let _ = write!(path, "&f-{name}=on");
        }
        for name in &request.excludes {
            let _ = write!(path, "&e-{name}=on");
        }
        path
    }

    /// Fetch one page from the current mirror. Transport failures surface
    /// as the 500 sentinel on the returned page, never as errors.
    pub async fn fetch_page(&self, path: &str) -> FetchedPage {
        let url = format!("{}{}", self.pool.current(), path);
        debug!("fetching {url}");
        self.fetcher.fetch(&url).await
    }

    /// Parse a fetched timeline page.
    pub fn parse_page(&self, html: &str) -> ParsedPage {
        parse_page(html)
    }

    pub fn current_mirror(&self) -> &str {
        self.pool.current()
    }

    /// Advance to the next mirror, wrapping around.
    pub fn rotate_mirror(&mut self) -> &str {
        self.pool.rotate()
    }

    pub fn mirror_count(&self) -> usize {
        self.pool.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> SearchWindow {
        SearchWindow::new(
            NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_search_path_encodes_query() {
        let request = SearchRequest::new("(ocean AND currents) OR (tide)");
        let path = RetrievalClient::search_path(&request, &window());
        assert!(path.starts_with("/search?f=tweets&q=%28ocean%20AND%20currents%29%20OR%20%28tide%29"));
        assert!(path.contains("&since=2019-01-01"));
        assert!(path.contains("&until=2020-01-01"));
        assert!(path.contains("&near="));
    }

    #[test]
    fn test_search_path_filter_flags_in_order() {
        let request = SearchRequest::new("q")
            .with_excludes(vec!["nativeretweets".into(), "replies".into()])
            .with_includes(vec!["verified".into()]);
        let path = RetrievalClient::search_path(&request, &window());
        assert!(path.ends_with("&f-verified=on&e-nativeretweets=on&e-replies=on"));
    }

    #[test]
    fn test_search_path_is_deterministic() {
        let request = SearchRequest::new("a b").with_near("boston");
        let first = RetrievalClient::search_path(&request, &window());
        let second = RetrievalClient::search_path(&request, &window());
        assert_eq!(first, second);
    }
}
