//! Item type definitions

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format used by mirror timelines after stripping the separator,
/// e.g. "Jan 5, 2023 3:04 PM"
const TIMELINE_TIMESTAMP: &str = "%b %d, %Y %I:%M %p";

/// ISO-8601 UTC format used by the dataset contract
const ISO_UTC: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Engagement counters attached to an item. A stat absent from the page is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub replies: u64,
    pub reshares: u64,
    pub quotes: u64,
    pub likes: u64,
}

/// A single retrieved post. Immutable once parsed; orchestrator annotations
/// live in `search::LabeledItem`, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Author handle, e.g. "@climatewatch"
    pub author: String,
    /// Post text, newline-normalized
    pub body: String,
    /// Publication time in UTC
    pub created_at: DateTime<Utc>,
    /// Mirror-relative permalink
    pub permalink: String,
    #[serde(default)]
    pub engagement: Engagement,
}

impl Item {
    /// Render `created_at` in the dataset's ISO-8601 UTC form.
    pub fn iso_created_at(&self) -> String {
        self.created_at.format(ISO_UTC).to_string()
    }
}

/// Classifier verdict on an item with respect to a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Entails,
    Neutral,
    Contradicts,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entails => "entails",
            Self::Neutral => "neutral",
            Self::Contradicts => "contradicts",
        }
    }

    /// Parse a label name. Accepts the MNLI-style uppercase spellings some
    /// classifier backends emit.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "entails" | "entailment" => Some(Self::Entails),
            "neutral" => Some(Self::Neutral),
            "contradicts" | "contradiction" => Some(Self::Contradicts),
            _ => None,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a mirror timeline timestamp ("Jan 5, 2023 · 3:04 PM UTC") into UTC.
/// Returns None when the value does not parse; callers drop such items
/// rather than retaining a sentinel.
pub fn parse_timeline_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let cleaned = raw.trim().replace(" ·", "");
    let cleaned = cleaned.strip_suffix(" UTC").unwrap_or(&cleaned);
    NaiveDateTime::parse_from_str(cleaned, TIMELINE_TIMESTAMP)
        .ok()
        .map(|dt| dt.and_utc())
}

/// Parse a dataset ISO-8601 UTC timestamp back into a `DateTime<Utc>`.
pub fn parse_iso_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a thousands-separated stat count, e.g. "1,204" -> 1204.
/// Empty or non-numeric input yields 0, never an error.
pub fn parse_stat_count(raw: &str) -> u64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
