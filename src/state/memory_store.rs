use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DedupLedger, ProgressState, StateStore};
use crate::error::Result;

/// Process-local store, for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    progress: Mutex<Option<ProgressState>>,
    ledger: Mutex<DedupLedger>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(progress: Option<ProgressState>, ledger: DedupLedger) -> Self {
        Self {
            progress: Mutex::new(progress),
            ledger: Mutex::new(ledger),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load_progress(&self) -> Option<ProgressState> {
        self.progress.lock().await.clone()
    }

    async fn load_ledger(&self) -> DedupLedger {
        self.ledger.lock().await.clone()
    }

    async fn save_progress(&self, state: &ProgressState) -> Result<()> {
        let mut stored = self.progress.lock().await;
        let mut merged = state.clone();
        if let Some(existing) = stored.as_ref() {
            merged.merge(existing);
        }
        *stored = Some(merged);
        Ok(())
    }

    async fn save_ledger(&self, ledger: &DedupLedger) -> Result<()> {
        self.ledger.lock().await.merge(ledger);
        Ok(())
    }

    async fn commit(&self, state: &ProgressState, ledger: &DedupLedger) -> Result<()> {
        // Both locks held so no reader sees one half of the commit
        let mut stored_progress = self.progress.lock().await;
        let mut stored_ledger = self.ledger.lock().await;

        let mut merged = state.clone();
        if let Some(existing) = stored_progress.as_ref() {
            merged.merge(existing);
        }
        stored_ledger.merge(ledger);
        *stored_progress = Some(merged);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory state".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RunDelta;
    use chrono::Utc;

    #[tokio::test]
    async fn test_commit_merges_both_halves() {
        let mut ledger = DedupLedger::new();
        ledger.add("https://a.example/1");
        let store = MemoryStateStore::with_state(None, ledger);

        let mut state = ProgressState::default();
        state.advance(
            &RunDelta {
                pages: vec![1],
                new_records: 1,
                new_batches: 1,
                duplicates: 0,
            },
            Utc::now(),
        );
        let mut update = DedupLedger::new();
        update.add("https://a.example/2");
        store.commit(&state, &update).await.unwrap();

        assert_eq!(store.load_progress().await, Some(state));
        let ledger = store.load_ledger().await;
        assert!(ledger.contains("https://a.example/1"));
        assert!(ledger.contains("https://a.example/2"));
    }
}
