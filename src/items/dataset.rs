//! CSV dataset contract
//!
//! One row per item with fixed columns
//! `user, text, created_at, link, comments, retweets, likes, quotes[, alignment]`.
//! This file format is the hand-off to the visualization dashboard; text
//! fields with embedded commas or newlines are CSV-escaped by the writer.

use super::types::{parse_iso_timestamp, parse_stat_count, Engagement, Item, Label};
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::path::Path;

const BASE_COLUMNS: [&str; 8] = [
    "user",
    "text",
    "created_at",
    "link",
    "comments",
    "retweets",
    "likes",
    "quotes",
];
const ALIGNMENT_COLUMN: &str = "alignment";

/// Streaming CSV writer for retrieved items.
pub struct DatasetWriter {
    inner: csv::Writer<File>,
    with_alignment: bool,
}

impl DatasetWriter {
    /// Create the file and write the header row. `with_alignment` adds the
    /// optional classifier column.
    pub fn create<P: AsRef<Path>>(path: P, with_alignment: bool) -> Result<Self> {
        let mut inner = csv::Writer::from_path(path.as_ref())
            .with_context(|| format!("creating dataset {}", path.as_ref().display()))?;
        let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
        if with_alignment {
            header.push(ALIGNMENT_COLUMN);
        }
        inner.write_record(&header)?;
        Ok(Self {
            inner,
            with_alignment,
        })
    }

    /// Append one item. `label` is ignored unless the writer was created
    /// with the alignment column.
    pub fn write(&mut self, item: &Item, label: Option<Label>) -> Result<()> {
        let mut record = vec![
            item.author.clone(),
            item.body.clone(),
            item.iso_created_at(),
            item.permalink.clone(),
            item.engagement.replies.to_string(),
            item.engagement.reshares.to_string(),
            item.engagement.likes.to_string(),
            item.engagement.quotes.to_string(),
        ];
        if self.with_alignment {
            record.push(label.map(|l| l.as_str().to_string()).unwrap_or_default());
        }
        self.inner.write_record(&record)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Read a dataset file back into items, with labels when the alignment
/// column is present. Rows whose timestamp does not parse are rejected,
/// matching the parser-side invariant.
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<(Item, Option<Label>)>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .with_context(|| format!("opening dataset {}", path.as_ref().display()))?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let idx: Vec<usize> = BASE_COLUMNS
        .iter()
        .map(|name| column(name).ok_or_else(|| anyhow!("dataset missing column '{name}'")))
        .collect::<Result<_>>()?;
    let alignment = column(ALIGNMENT_COLUMN);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| record.get(idx[i]).unwrap_or_default();
        let created_at = parse_iso_timestamp(field(2))
            .ok_or_else(|| anyhow!("unparseable created_at '{}'", field(2)))?;
        let item = Item {
            author: field(0).to_string(),
            body: field(1).to_string(),
            created_at,
            permalink: field(3).to_string(),
            engagement: Engagement {
                replies: parse_stat_count(field(4)),
                reshares: parse_stat_count(field(5)),
                likes: parse_stat_count(field(6)),
                quotes: parse_stat_count(field(7)),
            },
        };
        let label = alignment
            .and_then(|i| record.get(i))
            .and_then(Label::parse);
        rows.push((item, label));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Item {
        Item {
            author: "@poster".into(),
            body: "warming, they said,\nis \"natural\"".into(),
            created_at: Utc.with_ymd_and_hms(2013, 2, 10, 17, 45, 0).unwrap(),
            permalink: "/poster/status/3141".into(),
            engagement: Engagement {
                replies: 3,
                reshares: 1200,
                quotes: 7,
                likes: 4056,
            },
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = std::env::temp_dir().join("sourcefinder-dataset-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("round_trip.csv");

        let item = sample();
        let mut writer = DatasetWriter::create(&path, true).unwrap();
        writer.write(&item, Some(Label::Entails)).unwrap();
        writer.flush().unwrap();

        let rows = read_dataset(&path).unwrap();
        assert_eq!(rows.len(), 1);
        let (read, label) = &rows[0];
        assert_eq!(read.created_at, item.created_at);
        assert_eq!(read.permalink, item.permalink);
        assert_eq!(read.engagement, item.engagement);
        assert_eq!(read.body, item.body);
        assert_eq!(*label, Some(Label::Entails));
    }

    #[test]
    fn test_no_alignment_column() {
        let dir = std::env::temp_dir().join("sourcefinder-dataset-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("plain.csv");

        let mut writer = DatasetWriter::create(&path, false).unwrap();
        writer.write(&sample(), None).unwrap();
        writer.flush().unwrap();

        let rows = read_dataset(&path).unwrap();
        assert_eq!(rows[0].1, None);
    }
}
