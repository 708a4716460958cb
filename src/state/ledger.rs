//! Append-only set of listing identity keys seen across runs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Identified;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupLedger {
    #[serde(default)]
    urls: BTreeSet<String>,
}

/// Result of filtering a record set against the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome<T> {
    /// New records in input order
    pub unique: Vec<T>,
    pub duplicates: u64,
    /// Records without an identity key, passed through unrecorded
    pub keyless: u64,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.urls.contains(key)
    }

    /// Returns `true` when the key was not present before
    pub fn add(&mut self, key: impl Into<String>) -> bool {
        self.urls.insert(key.into())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    /// Union with another ledger; keys are never removed
    pub fn merge(&mut self, other: &DedupLedger) {
        self.urls.extend(other.urls.iter().cloned());
    }

    /// Classify every record as new or duplicate in a single pass.
    ///
    /// New keys are recorded as they are seen, so a key repeated within the
    /// same input counts as a duplicate from its second occurrence on.
    /// Records without a key cannot be deduplicated and are always kept.
    pub fn filter<T: Identified>(&mut self, records: Vec<T>) -> DedupOutcome<T> {
        let mut unique = Vec::with_capacity(records.len());
        let mut duplicates = 0;
        let mut keyless = 0;

        for record in records {
            match record.identity() {
                Some(key) if self.urls.contains(key) => {
                    debug!(url = key, "Dropping duplicate listing");
                    duplicates += 1;
                }
                Some(key) => {
                    self.urls.insert(key.to_string());
                    unique.push(record);
                }
                None => {
                    keyless += 1;
                    unique.push(record);
                }
            }
        }

        DedupOutcome {
            unique,
            duplicates,
            keyless,
        }
    }
}
