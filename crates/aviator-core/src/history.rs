//! Delivered history, read back
//!
//! The store keeps every appended payload as a string child under a generated
//! key, grouped by date bucket:
//!
//! ```text
//! {
//!   "2026-10-19": { "-Nabc123": "2.50x - 09:15:00", ... },
//!   ...
//! }
//! ```
//!
//! Only records whose timestamp is a clock time can be placed on a timeline;
//! raw-text fallbacks and anything malformed are skipped.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::trace;

use crate::error::Result;
use crate::observation::Observation;

/// One delivered observation with the moment it was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Date bucket plus the observed clock time
    pub recorded_at: NaiveDateTime,
    pub observation: Observation,
}

impl HistoryEntry {
    /// Parse one stored payload found under `bucket_key`
    ///
    /// Returns `None` when the bucket is not a `YYYY-MM-DD` date, the payload
    /// is malformed, or its timestamp is not a clock time.
    pub fn parse(bucket_key: &str, payload: &str) -> Option<Self> {
        let observation = Observation::from_payload(payload)?;
        if !observation.timestamp.is_clock_time() {
            return None;
        }

        let date = NaiveDate::parse_from_str(bucket_key, "%Y-%m-%d").ok()?;
        let time = observation.timestamp.as_str();
        let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
            .ok()?;

        Some(Self {
            recorded_at: date.and_time(time),
            observation,
        })
    }
}

/// Walk a history tree, returning every readable entry sorted by `recorded_at`
///
/// A `null` or non-object tree is an empty history, as is a bucket that is
/// not an object.
pub fn entries_from_tree(tree: &Value) -> Vec<HistoryEntry> {
    let Some(buckets) = tree.as_object() else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for (bucket_key, items) in buckets {
        let Some(items) = items.as_object() else {
            trace!("Skipping non-object bucket {}", bucket_key);
            continue;
        };

        for (key, item) in items {
            match item.as_str().and_then(|payload| HistoryEntry::parse(bucket_key, payload)) {
                Some(entry) => entries.push(entry),
                None => trace!("Skipping unreadable record {}/{}: {}", bucket_key, key, item),
            }
        }
    }

    entries.sort_by_key(|entry| entry.recorded_at);
    entries
}

/// Parse a history document and keep the `limit` most recent entries
pub fn recent_from_json(body: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
    let tree: Value = serde_json::from_str(body)?;
    Ok(keep_recent(entries_from_tree(&tree), limit))
}

/// Keep the last `limit` entries of a sorted list
pub fn keep_recent(mut entries: Vec<HistoryEntry>, limit: usize) -> Vec<HistoryEntry> {
    let excess = entries.len().saturating_sub(limit);
    entries.split_off(excess)
}
