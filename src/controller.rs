//! Run orchestration: select pages, fetch, clean, dedup, batch, persist.
//!
//! A run moves through the phases of [`RunPhase`] strictly in order. Nothing
//! is persisted before the batches are written, and the progress state is
//! only advanced once every batch landed in every destination.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::config::{RunMode, ScoutConfig};
use crate::error::{Result, ScoutError};
use crate::models::{Listing, RawListing};
use crate::pipeline::{clean_listings, flag_deals, plan_batches, top_deals, CleaningRules};
use crate::scrapers::ListingSource;
use crate::state::{decide_pages, PagePlan, ProgressState, RunDelta, StateStore};
use crate::writers::BatchWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    SelectingPages,
    Fetching,
    Cleaning,
    Deduping,
    Batching,
    PersistingState,
    Done,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub batch_size: usize,
    pub resume_window: u32,
    pub page_delay: Duration,
    pub cleaning: CleaningRules,
    /// How many deals a summary lists
    pub deal_limit: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from(&ScoutConfig::default())
    }
}

impl From<&ScoutConfig> for RunSettings {
    fn from(config: &ScoutConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            resume_window: config.resume_window,
            page_delay: config.page_delay,
            cleaning: CleaningRules {
                max_price: config.max_price,
                keep_keyless: config.keep_keyless,
            },
            deal_limit: 10,
        }
    }
}

/// Where one batch was written
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReceipt {
    pub number: u64,
    pub records: usize,
    pub destinations: Vec<String>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub plan: PagePlan,
    /// Pages whose listings made it into this run
    pub pages_fetched: Vec<u32>,
    /// First page that came back empty, if any
    pub end_of_data: Option<u32>,
    /// Transport failure that cut the page loop short
    pub interrupted: Option<ScoutError>,
    pub raw_records: usize,
    pub rejected: usize,
    pub keyless: u64,
    pub new_unique: usize,
    pub duplicates: u64,
    pub batches: Vec<BatchReceipt>,
    pub average_price_by_bedrooms: BTreeMap<u32, f64>,
    pub deals: Vec<Listing>,
    /// Progress state after this run
    pub totals: ProgressState,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Every requested page was already scraped; the source was not contacted
    NothingToDo {
        plan: PagePlan,
        totals: Option<ProgressState>,
    },
    Completed(RunSummary),
}

#[derive(Debug, Default)]
struct FetchedPages {
    records: Vec<RawListing>,
    pages: Vec<u32>,
    end_of_data: Option<u32>,
    interrupted: Option<ScoutError>,
}

struct PhaseLog {
    current: RunPhase,
}

impl PhaseLog {
    fn enter(&mut self, next: RunPhase) {
        debug!(from = ?self.current, to = ?next, "Run phase");
        self.current = next;
    }
}

pub struct RunController {
    source: Box<dyn ListingSource>,
    store: Box<dyn StateStore>,
    writers: Vec<Box<dyn BatchWriter>>,
    settings: RunSettings,
}

impl RunController {
    pub fn new(
        source: Box<dyn ListingSource>,
        store: Box<dyn StateStore>,
        writers: Vec<Box<dyn BatchWriter>>,
        settings: RunSettings,
    ) -> Self {
        Self {
            source,
            store,
            writers,
            settings,
        }
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    /// Read-only view of the current totals
    pub async fn progress(&self) -> Option<ProgressState> {
        self.store.load_progress().await
    }

    pub async fn run(&self, mode: RunMode) -> Result<RunOutcome> {
        let mut phases = PhaseLog {
            current: RunPhase::SelectingPages,
        };

        match self.execute(mode, &mut phases).await {
            Ok(outcome) => {
                phases.enter(RunPhase::Done);
                Ok(outcome)
            }
            Err(e) => {
                error!(phase = ?phases.current, error = %e, "Run aborted");
                phases.enter(RunPhase::Aborted);
                Err(e)
            }
        }
    }

    async fn execute(&self, mode: RunMode, phases: &mut PhaseLog) -> Result<RunOutcome> {
        let progress = self.store.load_progress().await;
        let mut ledger = self.store.load_ledger().await;

        let plan = decide_pages(progress.as_ref(), &mode, self.settings.resume_window)?;
        for page in &plan.skipped {
            info!(page, "⊘ Skipping page (already scraped)");
        }
        if plan.is_empty() {
            info!(start = plan.start, end = plan.end, "All requested pages have been scraped already");
            return Ok(RunOutcome::NothingToDo {
                plan,
                totals: progress,
            });
        }

        info!(
            pages = ?plan.to_fetch,
            known_listings = ledger.len(),
            store = %self.store.describe(),
            "Starting scrape"
        );

        phases.enter(RunPhase::Fetching);
        let fetched = self.fetch_pages(&plan.to_fetch).await;
        let raw_records = fetched.records.len();
        let previous = progress.unwrap_or_default();

        if fetched.pages.is_empty() {
            // Nothing usable came back; state stays as it was
            return Ok(RunOutcome::Completed(RunSummary {
                plan,
                pages_fetched: Vec::new(),
                end_of_data: fetched.end_of_data,
                interrupted: fetched.interrupted,
                raw_records,
                rejected: 0,
                keyless: 0,
                new_unique: 0,
                duplicates: 0,
                batches: Vec::new(),
                average_price_by_bedrooms: BTreeMap::new(),
                deals: Vec::new(),
                totals: previous,
            }));
        }

        phases.enter(RunPhase::Cleaning);
        let cleaned = clean_listings(fetched.records, &self.settings.cleaning);
        info!(kept = cleaned.kept.len(), rejected = cleaned.rejected.len(), "Cleaned listings");

        phases.enter(RunPhase::Deduping);
        let dedup = ledger.filter(cleaned.kept);
        let mut unique = dedup.unique;
        info!(
            unique = unique.len(),
            duplicates = dedup.duplicates,
            "Deduplicated against previously seen listings"
        );

        phases.enter(RunPhase::Batching);
        let batches = self.write_batches(&unique, previous.total_batches).await?;
        let average_price_by_bedrooms = flag_deals(&mut unique);
        let deals = top_deals(&unique, self.settings.deal_limit);

        phases.enter(RunPhase::PersistingState);
        let mut totals = previous;
        totals.advance(
            &RunDelta {
                pages: fetched.pages.clone(),
                new_records: unique.len() as u64,
                new_batches: batches.len() as u64,
                duplicates: dedup.duplicates,
            },
            Utc::now(),
        );
        self.store.commit(&totals, &ledger).await?;

        info!(
            pages = ?fetched.pages,
            new_records = unique.len(),
            duplicates = dedup.duplicates,
            total_records = totals.total_records,
            total_batches = totals.total_batches,
            "✅ Run complete"
        );

        Ok(RunOutcome::Completed(RunSummary {
            plan,
            pages_fetched: fetched.pages,
            end_of_data: fetched.end_of_data,
            interrupted: fetched.interrupted,
            raw_records,
            rejected: cleaned.rejected.len(),
            keyless: dedup.keyless,
            new_unique: unique.len(),
            duplicates: dedup.duplicates,
            batches,
            average_price_by_bedrooms,
            deals,
            totals,
        }))
    }

    /// Fetch pages in order until the list ends, a page comes back empty,
    /// or the source fails.
    async fn fetch_pages(&self, pages: &[u32]) -> FetchedPages {
        let mut fetched = FetchedPages::default();

        for (i, &page) in pages.iter().enumerate() {
            if i > 0 && !self.settings.page_delay.is_zero() {
                tokio::time::sleep(self.settings.page_delay).await;
            }

            info!(page, source = self.source.source_name(), "Scraping page");
            match self.source.fetch_page(page).await {
                Ok(records) if records.is_empty() => {
                    info!(page, "No more listings found, stopping");
                    fetched.end_of_data = Some(page);
                    break;
                }
                Ok(records) => {
                    debug!(page, listings = records.len(), "Fetched page");
                    fetched.pages.push(page);
                    fetched.records.extend(records);
                }
                Err(e) => {
                    let err = ScoutError::SourceFetch {
                        page,
                        message: format!("{:#}", e),
                    };
                    error!(page, error = %err, "Listing source failed, skipping remaining pages");
                    fetched.interrupted = Some(err);
                    break;
                }
            }
        }

        fetched
    }

    async fn write_batches(&self, listings: &[Listing], previous_batches: u64) -> Result<Vec<BatchReceipt>> {
        let mut receipts = Vec::new();

        for batch in plan_batches(listings, self.settings.batch_size, previous_batches) {
            let mut destinations = Vec::with_capacity(self.writers.len());
            for writer in &self.writers {
                let destination = writer
                    .write(batch.number, batch.records)
                    .await
                    .map_err(|e| match e {
                        e @ ScoutError::BatchWrite { .. } => e,
                        other => ScoutError::batch_write(batch.number, writer.destination_name(), other),
                    })?;
                destinations.push(destination);
            }
            info!(batch_number = batch.number, records = batch.records.len(), "✓ Saved batch");
            receipts.push(BatchReceipt {
                number: batch.number,
                records: batch.records.len(),
                destinations,
            });
        }

        Ok(receipts)
    }
}
