//! Provenance search orchestration

use super::models::{
    partition, DateRange, EarliestBuffer, LabeledItem, SearchOutcome, StepSize,
};
use crate::classify::{Classifier, ClassifyError};
use crate::items::Item;
use crate::pagination::{WindowOutcome, WindowSource};
use crate::retrieval::{SearchRequest, SearchWindow};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("date range is empty: {since} to {until}")]
    EmptyRange {
        since: chrono::NaiveDate,
        until: chrono::NaiveDate,
    },
    #[error("search query is empty")]
    EmptyQuery,
    #[error(transparent)]
    Classifier(#[from] ClassifyError),
}

/// Options steering one provenance search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Window step for the temporal scan
    pub step: StepSize,
    /// Capacity of the earliest-items buffer; zero disables it
    pub earliest_k: usize,
    /// Probe each window with a single page before the exhaustive scan
    pub probe_windows: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            step: StepSize::years(1),
            earliest_k: 0,
            probe_windows: false,
        }
    }
}

/// Top-level search over a windowed time range. Owns its window source and
/// classifier, so concurrent searches cannot share mirror state.
pub struct SourceFinder<S, C> {
    retriever: S,
    classifier: C,
}

impl<S: WindowSource, C: Classifier> SourceFinder<S, C> {
    pub fn new(retriever: S, classifier: C) -> Self {
        Self {
            retriever,
            classifier,
        }
    }

    fn validate(request: &SearchRequest, range: &DateRange) -> Result<(), SearchError> {
        if request.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if range.is_empty() {
            return Err(SearchError::EmptyRange {
                since: range.since,
                until: range.until,
            });
        }
        Ok(())
    }

    /// Find the earliest item entailing `claim`, scanning windows in
    /// increasing time order and stopping once a source is confirmed and
    /// the earliest-k buffer (when enabled) is full.
    pub async fn find_source(
        &mut self,
        claim: &str,
        request: &SearchRequest,
        range: DateRange,
        options: &SearchOptions,
    ) -> Result<SearchOutcome, SearchError> {
        Self::validate(request, &range)?;

        let windows = partition(&range, options.step);
        info!(
            "scanning {} windows between {} and {}",
            windows.len(),
            range.since,
            range.until
        );

        let mut buffer = EarliestBuffer::new(options.earliest_k);
        let mut source: Option<LabeledItem> = None;
        let mut supporting: Vec<LabeledItem> = Vec::new();

        for window in &windows {
            if source.is_some() && buffer.is_full() {
                break;
            }
            if options.probe_windows && !self.retriever.probe(request, window).await {
                debug!("window {} probed empty, skipping", window.label());
                continue;
            }

            let Some(items) = self.retrieve_oldest_first(request, window).await else {
                continue;
            };

            // the buffer admits only what it can still hold; just those
            // items get classified here
            let need = if buffer.is_full() {
                0
            } else {
                buffer.vacancy().min(items.len())
            };
            let mut labeled: Vec<LabeledItem> = Vec::new();
            if need > 0 {
                let labels = self.classify(claim, &items[..need]).await?;
                for (item, label) in items[..need].iter().zip(labels) {
                    let entry = LabeledItem::new(item.clone(), label);
                    buffer.push(entry.clone());
                    labeled.push(entry);
                }
            }

            if source.is_none() {
                // the slice above is the head of the oldest-first order, so
                // scan it before spending classifier calls on the rest
                let mut candidate = labeled.iter().find(|l| l.entails()).cloned();
                if candidate.is_none() && need < items.len() {
                    let rest = &items[need..];
                    let labels = self.classify(claim, rest).await?;
                    for (item, label) in rest.iter().zip(labels) {
                        labeled.push(LabeledItem::new(item.clone(), label));
                    }
                    candidate = labeled[need..].iter().find(|l| l.entails()).cloned();
                }

                if let Some(mut found) = candidate {
                    found.is_source = true;
                    info!(
                        "source candidate {} posted {}",
                        found.item.permalink, found.item.created_at
                    );
                    supporting = labeled.iter().filter(|l| l.entails()).cloned().collect();
                    for entry in &mut supporting {
                        if entry.item == found.item {
                            entry.is_source = true;
                        }
                    }
                    source = Some(found);
                }
            }
        }

        let reason = source.is_none().then(|| {
            format!(
                "no entailing item found between {} and {}",
                range.since, range.until
            )
        });
        Ok(SearchOutcome {
            source,
            supporting,
            earliest: buffer.into_items(),
            reason,
        })
    }

    /// Exhaustive variant: one window over the whole range, classify
    /// everything, return every entailing item with the earliest marked as
    /// the source.
    pub async fn find_all(
        &mut self,
        claim: &str,
        request: &SearchRequest,
        range: DateRange,
    ) -> Result<SearchOutcome, SearchError> {
        Self::validate(request, &range)?;

        let window = SearchWindow::new(
            range.since,
            range.until.succ_opt().unwrap_or(range.until),
        );
        let Some(items) = self.retrieve_oldest_first(request, &window).await else {
            return Ok(no_result("mirror retrieval failed and no items were collected"));
        };
        if items.is_empty() {
            return Ok(no_result("no items matched the query"));
        }

        let labels = self.classify(claim, &items).await?;
        let mut supporting: Vec<LabeledItem> = items
            .into_iter()
            .zip(labels)
            .map(|(item, label)| LabeledItem::new(item, label))
            .filter(LabeledItem::entails)
            .collect();
        if supporting.is_empty() {
            return Ok(no_result("none of the retrieved items entail the claim"));
        }

        // strict < keeps the first of equal timestamps, so page order
        // breaks ties
        let mut source_idx = 0;
        for (i, entry) in supporting.iter().enumerate().skip(1) {
            if entry.item.created_at < supporting[source_idx].item.created_at {
                source_idx = i;
            }
        }
        supporting[source_idx].is_source = true;
        let source = Some(supporting[source_idx].clone());

        Ok(SearchOutcome {
            source,
            supporting,
            earliest: Vec::new(),
            reason: None,
        })
    }

    /// Fetch a window and return its items oldest-first, or None when the
    /// window produced nothing usable. Failures are logged and skipped;
    /// they are never fatal to the search.
    async fn retrieve_oldest_first(
        &mut self,
        request: &SearchRequest,
        window: &SearchWindow,
    ) -> Option<Vec<Item>> {
        let fetched = self.retriever.fetch_window(request, window).await;
        if fetched.outcome == WindowOutcome::Failed {
            warn!("window {} failed on all mirrors, skipping", window.label());
            return None;
        }
        if fetched.items.is_empty() {
            debug!("window {} returned no items", window.label());
            return None;
        }
        let mut items = fetched.items;
        // mirrors return newest-first
        items.reverse();
        Some(items)
    }

    async fn classify(
        &mut self,
        claim: &str,
        items: &[Item],
    ) -> Result<Vec<crate::items::Label>, SearchError> {
        let labels = self.classifier.classify_batch(claim, items).await?;
        if labels.len() != items.len() {
            return Err(ClassifyError::LengthMismatch {
                expected: items.len(),
                got: labels.len(),
            }
            .into());
        }
        Ok(labels)
    }
}

fn no_result(reason: &str) -> SearchOutcome {
    SearchOutcome {
        source: None,
        supporting: Vec::new(),
        earliest: Vec::new(),
        reason: Some(reason.to_string()),
    }
}
