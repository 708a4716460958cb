//! Resumable progress bookkeeping and page selection.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::RunMode;
use crate::error::{Result, ScoutError};

/// Durable record of pages processed and cumulative counts.
///
/// `scraped_pages` only ever grows and `last_page` is always its maximum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default)]
    pub last_page: u32,
    #[serde(default)]
    pub scraped_pages: BTreeSet<u32>,
    /// Cumulative unique records written
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub total_batches: u64,
    #[serde(default)]
    pub duplicates_skipped: u64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scrape_range: Option<String>,
}

/// Local timestamps written by earlier versions of the metadata file
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// RFC 3339 first, then the naive forms (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// An unrecognised timestamp loads as `None` instead of failing the whole file
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// What a single run contributes to the progress state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunDelta {
    pub pages: Vec<u32>,
    pub new_records: u64,
    pub new_batches: u64,
    pub duplicates: u64,
}

impl ProgressState {
    /// Fold one run into the state: pages are unioned, counters summed.
    pub fn advance(&mut self, delta: &RunDelta, now: DateTime<Utc>) {
        self.scraped_pages.extend(delta.pages.iter().copied());
        self.last_page = self.scraped_pages.last().copied().unwrap_or(0);
        self.total_records += delta.new_records;
        self.total_batches += delta.new_batches;
        self.duplicates_skipped += delta.duplicates;
        self.last_updated = Some(now);
        if let (Some(first), Some(last)) = (delta.pages.iter().min(), delta.pages.iter().max()) {
            self.last_scrape_range = Some(format!("{}-{}", first, last));
        }
    }

    /// Merge another snapshot of the same state without ever shrinking it.
    ///
    /// Used by stores before overwriting: page sets are unioned and counters
    /// keep the larger value, so re-saving a stale snapshot is a no-op.
    pub fn merge(&mut self, other: &ProgressState) {
        self.scraped_pages.extend(other.scraped_pages.iter().copied());
        self.last_page = self
            .scraped_pages
            .last()
            .copied()
            .unwrap_or(0)
            .max(self.last_page)
            .max(other.last_page);
        self.total_records = self.total_records.max(other.total_records);
        self.total_batches = self.total_batches.max(other.total_batches);
        self.duplicates_skipped = self.duplicates_skipped.max(other.duplicates_skipped);
        if other.last_updated > self.last_updated {
            self.last_updated = other.last_updated;
            if other.last_scrape_range.is_some() {
                self.last_scrape_range = other.last_scrape_range.clone();
            }
        }
    }

    pub fn contains_page(&self, page: u32) -> bool {
        self.scraped_pages.contains(&page)
    }
}

/// Outcome of page selection for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    pub start: u32,
    pub end: u32,
    /// Pages to fetch, ascending
    pub to_fetch: Vec<u32>,
    /// Pages in the window that were already scraped and will not be fetched
    pub skipped: Vec<u32>,
}

impl PagePlan {
    /// Nothing left to fetch; a regular outcome, not a failure
    pub fn is_empty(&self) -> bool {
        self.to_fetch.is_empty()
    }
}

/// Resolve which pages a run should fetch.
///
/// `Resume` continues after `last_page` for `resume_window` pages (or starts at
/// page 1 without prior state). Already scraped pages are skipped unless the
/// mode forces a re-scrape.
pub fn decide_pages(
    state: Option<&ProgressState>,
    mode: &RunMode,
    resume_window: u32,
) -> Result<PagePlan> {
    let window = resume_window.max(1);
    let (start, end) = match *mode {
        RunMode::Resume => {
            let start = state.map(|s| s.last_page.saturating_add(1)).unwrap_or(1);
            (start, start.saturating_add(window - 1))
        }
        RunMode::Range { start, end } | RunMode::Force { start, end } => (start, end),
    };

    if start > end {
        return Err(ScoutError::InvalidRange { start, end });
    }

    let force = mode.is_forced();
    let (skipped, to_fetch): (Vec<u32>, Vec<u32>) = (start..=end)
        .partition(|page| !force && state.is_some_and(|s| s.contains_page(*page)));

    Ok(PagePlan {
        start,
        end,
        to_fetch,
        skipped,
    })
}
