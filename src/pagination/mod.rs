//! Window pagination engine
//!
//! Drives the retrieval client across every page of one query window until
//! a terminal signal, rotating mirrors on failure. Transient mirror errors
//! never surface above this module; a window that fails on every mirror is
//! reported as failed-empty and the caller moves on.

use crate::items::Item;
use crate::retrieval::{Continuation, RetrievalClient, SearchRequest, SearchWindow};
use async_trait::async_trait;
use tracing::{debug, warn};

/// How a window scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    /// All pages consumed: terminal marker seen or no further coverage.
    Complete,
    /// Every mirror failed for this window.
    Failed,
}

/// Items collected for one window plus how the scan ended.
#[derive(Debug, Clone)]
pub struct WindowFetch {
    pub items: Vec<Item>,
    pub outcome: WindowOutcome,
}

impl WindowFetch {
    fn complete(items: Vec<Item>) -> Self {
        Self {
            items,
            outcome: WindowOutcome::Complete,
        }
    }

    fn failed(items: Vec<Item>) -> Self {
        Self {
            items,
            outcome: WindowOutcome::Failed,
        }
    }
}

/// Source of windowed items for the search orchestrator. Implemented by
/// `PaginationEngine`; test doubles script window results directly.
#[async_trait]
pub trait WindowSource: Send {
    /// Retrieve every item the source has for one window.
    async fn fetch_window(&mut self, request: &SearchRequest, window: &SearchWindow)
        -> WindowFetch;

    /// Cheap single-page existence probe. Pre-filter only: a failed probe
    /// reports `true` so no window is ever skipped on a transport error.
    async fn probe(&mut self, request: &SearchRequest, window: &SearchWindow) -> bool;
}

/// Paginates one window at a time over a rotating mirror pool.
pub struct PaginationEngine {
    client: RetrievalClient,
}

impl PaginationEngine {
    pub fn new(client: RetrievalClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WindowSource for PaginationEngine {
    async fn fetch_window(
        &mut self,
        request: &SearchRequest,
        window: &SearchWindow,
    ) -> WindowFetch {
        let base = RetrievalClient::search_path(request, window);
        let mut items: Vec<Item> = Vec::new();
        let mut cursor: Option<String> = None;
        // one rotation per pool member for the whole window, whatever mix of
        // failures and dry mirrors triggered them
        let mut rotations = 0;
        let budget = self.client.mirror_count();

        loop {
            let path = match &cursor {
                Some(token) => format!("{base}&cursor={token}"),
                None => base.clone(),
            };
            let page = self.client.fetch_page(&path).await;

            if page.is_server_error() {
                rotations += 1;
                if rotations >= budget {
                    warn!("window {} failed on every mirror", window.label());
                    return WindowFetch::failed(items);
                }
                warn!(
                    "mirror {} unresponsive for window {}, rotating",
                    self.client.current_mirror(),
                    window.label()
                );
                // same page request retried on the next mirror
                self.client.rotate_mirror();
                continue;
            }

            let parsed = self.client.parse_page(&page.html);
            match parsed.continuation {
                Continuation::Finished => {
                    items.extend(parsed.items);
                    debug!(
                        "window {} exhausted with {} items",
                        window.label(),
                        items.len()
                    );
                    return WindowFetch::complete(items);
                }
                Continuation::Token(token) if !parsed.items.is_empty() => {
                    items.extend(parsed.items);
                    cursor = Some(token);
                }
                Continuation::MirrorEnd if !parsed.items.is_empty() => {
                    // items but no way forward: window complete on this mirror
                    items.extend(parsed.items);
                    return WindowFetch::complete(items);
                }
                _ => {
                    // empty page without the terminal marker: this mirror has
                    // nothing (more) for the window. Cursors are not portable
                    // across mirrors, so the window restarts from scratch on
                    // the next one.
                    rotations += 1;
                    if rotations >= budget {
                        return WindowFetch::complete(items);
                    }
                    debug!(
                        "mirror {} out of coverage for window {}, rotating",
                        self.client.current_mirror(),
                        window.label()
                    );
                    self.client.rotate_mirror();
                    cursor = None;
                    items.clear();
                }
            }
        }
    }

    async fn probe(&mut self, request: &SearchRequest, window: &SearchWindow) -> bool {
        let path = RetrievalClient::search_path(request, window);
        let page = self.client.fetch_page(&path).await;
        if page.is_server_error() {
            return true;
        }
        let parsed = self.client.parse_page(&page.html);
        !parsed.items.is_empty() || matches!(parsed.continuation, Continuation::Token(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{FetchedPage, PageFetch};
    use crate::retrieval::MirrorPool;
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};

    /// Serves a scripted sequence of responses and records the URLs asked for.
    struct ScriptedFetch {
        responses: Mutex<Vec<FetchedPage>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetch {
        fn new(responses: Vec<FetchedPage>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetch for ScriptedFetch {
        async fn fetch(&self, url: &str) -> FetchedPage {
            self.calls.lock().unwrap().push(url.to_string());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                panic!("unexpected fetch of {url}");
            }
            responses.remove(0)
        }
    }

    fn ok(html: &str) -> FetchedPage {
        FetchedPage {
            html: html.to_string(),
            status: 200,
            url: String::new(),
        }
    }

    fn err() -> FetchedPage {
        FetchedPage {
            html: String::new(),
            status: 500,
            url: String::new(),
        }
    }

    fn item(author: &str, ts: &str) -> String {
        format!(
            r#"<div class="timeline-item">
              <a class="username" href="/{author}">@{author}</a>
              <span class="tweet-date"><a href="/{author}/status/1" title="{ts}">rel</a></span>
              <div class="tweet-content">text by {author}</div>
            </div>"#
        )
    }

    fn page_with_cursor(body: &str, cursor: &str) -> String {
        format!(
            r#"<html><body>{body}<div class="show-more"><a href="?q=x&cursor={cursor}">Load more</a></div></body></html>"#
        )
    }

    fn final_page(body: &str) -> String {
        format!(r#"<html><body>{body}<h2 class="timeline-end">done</h2></body></html>"#)
    }

    fn engine(fetcher: Arc<ScriptedFetch>, mirrors: &[&str]) -> PaginationEngine {
        let pool = MirrorPool::new(mirrors.iter().map(|m| m.to_string()).collect());
        PaginationEngine::new(RetrievalClient::new(fetcher, pool))
    }

    fn window() -> SearchWindow {
        SearchWindow::new(
            NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fetches_until_terminal_marker() {
        let fetcher = ScriptedFetch::new(vec![
            ok(&page_with_cursor(
                &item("alice", "Jan 5, 2019 · 3:00 PM UTC"),
                "CUR1",
            )),
            ok(&final_page(&item("bob", "Jan 2, 2019 · 1:00 PM UTC"))),
        ]);
        let mut engine = engine(fetcher.clone(), &["https://m1.example"]);

        let fetched = engine
            .fetch_window(&SearchRequest::new("q"), &window())
            .await;

        assert_eq!(fetched.outcome, WindowOutcome::Complete);
        assert_eq!(fetched.items.len(), 2);
        assert_eq!(fetched.items[0].author, "@alice");
        assert_eq!(fetched.items[1].author, "@bob");

        // exactly two fetches, the second carrying the cursor
        let calls = fetcher.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].ends_with("&cursor=CUR1"));
    }

    #[tokio::test]
    async fn test_failover_retries_same_window_on_next_mirror() {
        let fetcher = ScriptedFetch::new(vec![
            err(),
            ok(&final_page(&item("carol", "Mar 1, 2019 · 9:00 AM UTC"))),
        ]);
        let mut engine = engine(fetcher.clone(), &["https://m1.example", "https://m2.example"]);

        let fetched = engine
            .fetch_window(&SearchRequest::new("q"), &window())
            .await;

        assert_eq!(fetched.outcome, WindowOutcome::Complete);
        assert_eq!(fetched.items.len(), 1);

        let calls = fetcher.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("https://m1.example/search"));
        assert!(calls[1].starts_with("https://m2.example/search"));
        // same window, same page request
        let tail = |s: &str| s.split(".example").nth(1).unwrap().to_string();
        assert_eq!(tail(&calls[0]), tail(&calls[1]));
    }

    #[tokio::test]
    async fn test_all_mirrors_failing_reports_failed() {
        let fetcher = ScriptedFetch::new(vec![err(), err()]);
        let mut engine = engine(fetcher.clone(), &["https://m1.example", "https://m2.example"]);

        let fetched = engine
            .fetch_window(&SearchRequest::new("q"), &window())
            .await;

        assert_eq!(fetched.outcome, WindowOutcome::Failed);
        assert!(fetched.items.is_empty());
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_page_rotates_and_restarts_window() {
        let empty = ok("<html><body></body></html>");
        let fetcher = ScriptedFetch::new(vec![
            empty,
            ok(&final_page(&item("dave", "Jun 1, 2019 · 5:00 PM UTC"))),
        ]);
        let mut engine = engine(fetcher.clone(), &["https://m1.example", "https://m2.example"]);

        let fetched = engine
            .fetch_window(&SearchRequest::new("q"), &window())
            .await;

        assert_eq!(fetched.outcome, WindowOutcome::Complete);
        assert_eq!(fetched.items.len(), 1);

        let calls = fetcher.calls();
        assert!(calls[0].starts_with("https://m1.example"));
        // window restarted from an empty cursor on the next mirror
        assert!(calls[1].starts_with("https://m2.example"));
        assert!(!calls[1].contains("cursor="));
    }

    #[tokio::test]
    async fn test_every_mirror_dry_completes_with_nothing() {
        let fetcher = ScriptedFetch::new(vec![
            ok("<html><body></body></html>"),
            ok("<html><body></body></html>"),
        ]);
        let mut engine = engine(fetcher.clone(), &["https://m1.example", "https://m2.example"]);

        let fetched = engine
            .fetch_window(&SearchRequest::new("q"), &window())
            .await;

        assert_eq!(fetched.outcome, WindowOutcome::Complete);
        assert!(fetched.items.is_empty());
    }

    #[tokio::test]
    async fn test_probe() {
        let fetcher = ScriptedFetch::new(vec![
            ok(&final_page(&item("erin", "Jul 1, 2019 · 2:00 PM UTC"))),
            ok("<html><body></body></html>"),
            err(),
        ]);
        let mut engine = engine(fetcher.clone(), &["https://m1.example"]);
        let request = SearchRequest::new("q");

        assert!(engine.probe(&request, &window()).await);
        assert!(!engine.probe(&request, &window()).await);
        // a failed probe never skips a window
        assert!(engine.probe(&request, &window()).await);
    }
}
