//! Search data models: ranges, steps, buffers, outcomes

use crate::items::{Item, Label};
use crate::retrieval::SearchWindow;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inclusive date range to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

impl DateRange {
    pub fn new(since: NaiveDate, until: NaiveDate) -> Self {
        Self { since, until }
    }

    pub fn is_empty(&self) -> bool {
        self.until < self.since
    }
}

/// Window step granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Years,
    Months,
}

/// Step size for temporal windows. The count is clamped to at least one so
/// a window always makes forward progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSize {
    count: u32,
    granularity: Granularity,
}

impl StepSize {
    pub fn new(count: u32, granularity: Granularity) -> Self {
        Self {
            count: count.max(1),
            granularity,
        }
    }

    pub fn years(count: u32) -> Self {
        Self::new(count, Granularity::Years)
    }

    pub fn months(count: u32) -> Self {
        Self::new(count, Granularity::Months)
    }

    fn advance(&self, date: NaiveDate) -> NaiveDate {
        let months = match self.granularity {
            Granularity::Years => self.count * 12,
            Granularity::Months => self.count,
        };
        date.checked_add_months(Months::new(months))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// Partition an inclusive range into consecutive half-open windows in
/// strictly increasing chronological order. The last window is clamped to
/// the day after `until` so the final day stays inside the scan.
pub fn partition(range: &DateRange, step: StepSize) -> Vec<SearchWindow> {
    let mut windows = Vec::new();
    let end = range.until.succ_opt().unwrap_or(range.until);
    let mut start = range.since;
    while start < end {
        let next = step.advance(start);
        windows.push(SearchWindow::new(start, next.min(end)));
        start = next;
    }
    windows
}

/// A classified item plus orchestrator annotations. The retrieval layer
/// never sees these fields.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledItem {
    pub item: Item,
    pub label: Label,
    pub is_source: bool,
}

impl LabeledItem {
    pub fn new(item: Item, label: Label) -> Self {
        Self {
            item,
            label,
            is_source: false,
        }
    }

    pub fn entails(&self) -> bool {
        self.label == Label::Entails
    }
}

/// Bounded FIFO of the chronologically earliest items seen across a scan.
/// Windows arrive in increasing time order and window items are pushed
/// oldest-first, so discovery order is chronological. Once full, nothing
/// is admitted or evicted.
#[derive(Debug, Clone)]
pub struct EarliestBuffer {
    capacity: usize,
    items: Vec<LabeledItem>,
}

impl EarliestBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    /// Full also when disabled, so "source found and buffer full" reads as
    /// the single loop-termination condition.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// How many more items the buffer admits.
    pub fn vacancy(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    /// Push unless full. Returns whether the item was admitted.
    pub fn push(&mut self, item: LabeledItem) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<LabeledItem> {
        self.items
    }
}

/// Result of a provenance search. `source` is None with a human-readable
/// `reason` when nothing qualified; collaborator failures surface as errors
/// instead.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub source: Option<LabeledItem>,
    pub supporting: Vec<LabeledItem>,
    pub earliest: Vec<LabeledItem>,
    pub reason: Option<String>,
}

/// Author activity summary over a set of labeled items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorActivity {
    pub author: String,
    pub count: usize,
    pub bodies: Vec<String>,
}

/// The `n` authors with the most items, most active first. Ties break by
/// author handle so the ranking is deterministic.
pub fn top_authors(items: &[LabeledItem], n: usize) -> Vec<AuthorActivity> {
    let mut by_author: HashMap<&str, Vec<&str>> = HashMap::new();
    for labeled in items {
        by_author
            .entry(labeled.item.author.as_str())
            .or_default()
            .push(labeled.item.body.as_str());
    }
    let mut ranked: Vec<AuthorActivity> = by_author
        .into_iter()
        .map(|(author, bodies)| AuthorActivity {
            author: author.to_string(),
            count: bodies.len(),
            bodies: bodies.into_iter().map(str::to_string).collect(),
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.author.cmp(&b.author)));
    ranked.truncate(n);
    ranked
}
