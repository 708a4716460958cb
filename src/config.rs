//! Typed configuration for scrape runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scrapers::types::ListingSelectors;

pub const DEFAULT_DATA_DIR: &str = "pulled-data";
pub const METADATA_FILE: &str = "scrape_metadata.json";
pub const LEDGER_FILE: &str = "property_hashes.json";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_RESUME_WINDOW: u32 = 10;
pub const DEFAULT_MAX_PRICE: u64 = 2_000_000_000;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(2);

/// Which pages a run should cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Continue after the last scraped page
    Resume,
    /// Explicit inclusive range, skipping pages already scraped
    Range { start: u32, end: u32 },
    /// Explicit inclusive range, re-scraping everything in it
    Force { start: u32, end: u32 },
}

impl RunMode {
    pub fn is_forced(&self) -> bool {
        matches!(self, Self::Force { .. })
    }
}

/// Batch destinations a run writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Csv,
    Json,
    Sqlite,
}

/// Settings for the HTTP listing source
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Search results URL; the page number is appended as a query parameter
    pub base_url: String,
    pub page_param: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub selectors: ListingSelectors,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.propertypro.ng/property-for-rent".to_string(),
            page_param: "page".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            timeout: Duration::from_secs(30),
            selectors: ListingSelectors::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub data_dir: PathBuf,
    pub source: SourceConfig,
    /// Pause between consecutive page fetches
    pub page_delay: Duration,
    pub batch_size: usize,
    pub resume_window: u32,
    /// Prices at or above this are treated as bogus
    pub max_price: u64,
    /// Keep listings without a URL (they bypass deduplication)
    pub keep_keyless: bool,
    pub outputs: Vec<OutputKind>,
    pub sqlite_path: Option<PathBuf>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            source: SourceConfig::default(),
            page_delay: DEFAULT_PAGE_DELAY,
            batch_size: DEFAULT_BATCH_SIZE,
            resume_window: DEFAULT_RESUME_WINDOW,
            max_price: DEFAULT_MAX_PRICE,
            keep_keyless: false,
            outputs: vec![OutputKind::Csv],
            sqlite_path: None,
        }
    }
}

impl ScoutConfig {
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<OutputKind>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_keep_keyless(mut self, keep: bool) -> Self {
        self.keep_keyless = keep;
        self
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(METADATA_FILE)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("listings.db"))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_live_in_data_dir() {
        let config = ScoutConfig::default().with_data_dir("/tmp/scout");
        assert_eq!(config.metadata_path(), PathBuf::from("/tmp/scout/scrape_metadata.json"));
        assert_eq!(config.ledger_path(), PathBuf::from("/tmp/scout/property_hashes.json"));
        assert_eq!(config.sqlite_path(), PathBuf::from("/tmp/scout/listings.db"));
    }

    #[test]
    fn test_batch_size_is_never_zero() {
        assert_eq!(ScoutConfig::default().with_batch_size(0).batch_size, 1);
    }

    #[test]
    fn test_only_force_mode_is_forced() {
        assert!(RunMode::Force { start: 1, end: 2 }.is_forced());
        assert!(!RunMode::Range { start: 1, end: 2 }.is_forced());
        assert!(!RunMode::Resume.is_forced());
    }
}
