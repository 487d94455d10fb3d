//! Timeline page parsing
//!
//! Mirrors render results as an HTML timeline. Parsing extracts the items,
//! drops entries without a valid timestamp, and reads the continuation
//! affordance into a tagged variant so no string sentinels leak upward.
//! Unexpected markup parses to zero items; that is indistinguishable from
//! "no results" on purpose, since mirror markup legitimately varies.

use crate::items::{parse_stat_count, parse_timeline_timestamp, Engagement, Item};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("div.timeline-item").unwrap());
static USERNAME: Lazy<Selector> = Lazy::new(|| Selector::parse("a.username").unwrap());
static CONTENT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.tweet-content").unwrap());
static DATE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("span.tweet-date > a").unwrap());
static PERMALINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.tweet-link").unwrap());
static STAT: Lazy<Selector> = Lazy::new(|| Selector::parse("span.tweet-stat > div").unwrap());
static END_MARKER: Lazy<Selector> = Lazy::new(|| Selector::parse("h2.timeline-end").unwrap());
static SHOW_MORE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.show-more > a").unwrap());

/// Continuation state extracted from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Opaque cursor for the next page on the same mirror.
    Token(String),
    /// No continuation link and no terminal marker: this mirror has nothing
    /// more for the window. Not global exhaustion.
    MirrorEnd,
    /// Terminal marker present: no more results for this query, on any mirror.
    Finished,
}

/// Items plus continuation state for one fetched page.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub items: Vec<Item>,
    pub continuation: Continuation,
}

/// Parse one timeline page.
pub fn parse_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    let mut items = Vec::new();
    for element in document.select(&ITEM) {
        match parse_item(&element) {
            Some(item) => items.push(item),
            None => debug!("dropping timeline item without a parseable timestamp"),
        }
    }

    let continuation = if document.select(&END_MARKER).next().is_some() {
        Continuation::Finished
    } else if let Some(token) = extract_cursor(&document) {
        Continuation::Token(token)
    } else {
        Continuation::MirrorEnd
    };

    ParsedPage {
        items,
        continuation,
    }
}

fn parse_item(element: &ElementRef) -> Option<Item> {
    let author = element
        .select(&USERNAME)
        .next()
        .map(collect_text)
        .unwrap_or_default();

    let body = element
        .select(&CONTENT)
        .next()
        .map(collect_text)
        .unwrap_or_default()
        .replace('\n', " ");

    // items without a valid timestamp are dropped, not kept with a sentinel
    let raw_ts = element
        .select(&DATE_LINK)
        .next()
        .and_then(|a| a.value().attr("title"))?;
    let created_at = parse_timeline_timestamp(raw_ts)?;

    let permalink = element
        .select(&PERMALINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .unwrap_or_default()
        .to_string();

    let stats: Vec<String> = element.select(&STAT).map(collect_text).collect();
    let engagement = if stats.len() < 4 {
        Engagement::default()
    } else {
        // page order: replies, reshares, quotes, likes
        Engagement {
            replies: parse_stat_count(&stats[0]),
            reshares: parse_stat_count(&stats[1]),
            quotes: parse_stat_count(&stats[2]),
            likes: parse_stat_count(&stats[3]),
        }
    };

    Some(Item {
        author,
        body,
        created_at,
        permalink,
        engagement,
    })
}

fn collect_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// The last show-more link on the page carries the pagination cursor.
/// (The first one, when present, loads newer items and is ignored.)
fn extract_cursor(document: &Html) -> Option<String> {
    let href = document.select(&SHOW_MORE).last()?.value().attr("href")?;
    let (_, tail) = href.split_once("cursor=")?;
    let token = tail.split('&').next().unwrap_or(tail);
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
