pub mod file_store;
pub mod ledger;
pub mod memory_store;
pub mod progress;

pub use file_store::JsonFileStore;
pub use ledger::{DedupLedger, DedupOutcome};
pub use memory_store::MemoryStateStore;
pub use progress::{decide_pages, PagePlan, ProgressState, RunDelta};

use crate::error::Result;
use async_trait::async_trait;

/// Durable home of the progress state and the dedup ledger.
///
/// Loads never fail: missing or unreadable state yields an empty default.
/// Saves merge with what is already stored and must leave the previous
/// state intact when they fail.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_progress(&self) -> Option<ProgressState>;

    async fn load_ledger(&self) -> DedupLedger;

    async fn save_progress(&self, state: &ProgressState) -> Result<()>;

    async fn save_ledger(&self, ledger: &DedupLedger) -> Result<()>;

    /// Persist both at the end of a run, all or nothing: on error neither
    /// the stored progress nor the stored ledger may have changed.
    async fn commit(&self, state: &ProgressState, ledger: &DedupLedger) -> Result<()>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}
