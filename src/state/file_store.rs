use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use super::{DedupLedger, ProgressState, StateStore};
use crate::error::{Result, ScoutError};

/// Progress and ledger kept as two JSON files.
///
/// Writes go to a sibling `.tmp` file that is renamed over the target, so a
/// failed save never truncates the previous file. A commit stages both temp
/// files before renaming either, and puts the old ledger back if the progress
/// file cannot be replaced.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    metadata_path: PathBuf,
    ledger_path: PathBuf,
}

/// Serialized content sitting in a temp file next to its target
struct StagedFile {
    temp_path: PathBuf,
    target: PathBuf,
    bytes: usize,
}

impl StagedFile {
    async fn write(target: &Path, content: &[u8]) -> Result<Self> {
        let label = target.display().to_string();

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScoutError::persistence(&label, e))?;
        }

        let temp_path = target.with_extension("json.tmp");
        let staged = Self {
            temp_path,
            target: target.to_path_buf(),
            bytes: content.len(),
        };
        if let Err(e) = staged.fill(content).await {
            staged.discard().await;
            return Err(ScoutError::persistence(&label, e));
        }
        Ok(staged)
    }

    async fn fill(&self, content: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(&self.temp_path).await?;
        file.write_all(content).await?;
        file.sync_all().await
    }

    async fn publish(self) -> Result<()> {
        if let Err(e) = tokio::fs::rename(&self.temp_path, &self.target).await {
            self.discard().await;
            return Err(ScoutError::persistence(self.target.display().to_string(), e));
        }
        debug!(path = %self.target.display(), bytes = self.bytes, "Persisted state file");
        Ok(())
    }

    async fn discard(&self) {
        let _ = tokio::fs::remove_file(&self.temp_path).await;
    }
}

impl JsonFileStore {
    pub fn new(metadata_path: impl Into<PathBuf>, ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            metadata_path: metadata_path.into(),
            ledger_path: ledger_path.into(),
        }
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No state file yet");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable state file, starting from empty state");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt state file, starting from empty state");
                None
            }
        }
    }

    async fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<StagedFile> {
        let json = serde_json::to_string_pretty(value)?;
        StagedFile::write(path, json.as_bytes()).await
    }

    async fn merged_progress(&self, state: &ProgressState) -> ProgressState {
        let mut merged = state.clone();
        if let Some(existing) = self.load_progress().await {
            merged.merge(&existing);
        }
        merged
    }

    async fn merged_ledger(&self, ledger: &DedupLedger) -> DedupLedger {
        let mut merged = ledger.clone();
        merged.merge(&self.load_ledger().await);
        merged
    }

    /// Put the ledger file back the way it was before a failed commit
    async fn restore_ledger(&self, previous: Option<Vec<u8>>) {
        let restored = match previous {
            Some(content) => match StagedFile::write(&self.ledger_path, &content).await {
                Ok(staged) => staged.publish().await,
                Err(e) => Err(e),
            },
            None => tokio::fs::remove_file(&self.ledger_path)
                .await
                .map_err(|e| ScoutError::persistence(self.ledger_path.display().to_string(), e)),
        };
        if let Err(e) = restored {
            error!(path = %self.ledger_path.display(), error = %e, "Failed to roll back ledger after failed commit");
        }
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load_progress(&self) -> Option<ProgressState> {
        Self::read_json(&self.metadata_path).await
    }

    async fn load_ledger(&self) -> DedupLedger {
        Self::read_json(&self.ledger_path).await.unwrap_or_default()
    }

    async fn save_progress(&self, state: &ProgressState) -> Result<()> {
        let merged = self.merged_progress(state).await;
        Self::stage_json(&self.metadata_path, &merged).await?.publish().await
    }

    async fn save_ledger(&self, ledger: &DedupLedger) -> Result<()> {
        let merged = self.merged_ledger(ledger).await;
        Self::stage_json(&self.ledger_path, &merged).await?.publish().await
    }

    async fn commit(&self, state: &ProgressState, ledger: &DedupLedger) -> Result<()> {
        let progress = self.merged_progress(state).await;
        let merged_ledger = self.merged_ledger(ledger).await;

        let staged_ledger = Self::stage_json(&self.ledger_path, &merged_ledger).await?;
        let staged_progress = match Self::stage_json(&self.metadata_path, &progress).await {
            Ok(staged) => staged,
            Err(e) => {
                staged_ledger.discard().await;
                return Err(e);
            }
        };

        let previous_ledger = match tokio::fs::read(&self.ledger_path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                staged_ledger.discard().await;
                staged_progress.discard().await;
                return Err(ScoutError::persistence(self.ledger_path.display().to_string(), e));
            }
        };

        if let Err(e) = staged_ledger.publish().await {
            staged_progress.discard().await;
            return Err(e);
        }
        if let Err(e) = staged_progress.publish().await {
            self.restore_ledger(previous_ledger).await;
            return Err(e);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "{} + {}",
            self.metadata_path.display(),
            self.ledger_path.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RunDelta;
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_temp_store() -> (TempDir, JsonFileStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(
            temp_dir.path().join("scrape_metadata.json"),
            temp_dir.path().join("property_hashes.json"),
        );
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_missing_files_load_as_empty() {
        let (_temp_dir, store) = create_temp_store();
        assert!(store.load_progress().await.is_none());
        assert!(store.load_ledger().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_files_load_as_empty() {
        let (_temp_dir, store) = create_temp_store();
        std::fs::write(store.metadata_path(), "{ not json").unwrap();
        std::fs::write(store.ledger_path(), "[1, 2").unwrap();
        assert!(store.load_progress().await.is_none());
        assert!(store.load_ledger().await.is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_and_file_layout() {
        let (_temp_dir, store) = create_temp_store();
        let mut state = ProgressState::default();
        state.advance(
            &RunDelta {
                pages: vec![1, 2],
                new_records: 42,
                new_batches: 1,
                duplicates: 0,
            },
            Utc::now(),
        );
        let mut ledger = DedupLedger::new();
        ledger.add("https://a.example/1");

        store.commit(&state, &ledger).await.unwrap();

        assert_eq!(store.load_progress().await, Some(state));
        assert!(store.load_ledger().await.contains("https://a.example/1"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.ledger_path()).unwrap()).unwrap();
        assert_eq!(raw["urls"][0], "https://a.example/1");
        assert!(!store.metadata_path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_saving_stale_state_never_shrinks() {
        let (_temp_dir, store) = create_temp_store();
        let now = Utc::now();
        let mut newer = ProgressState::default();
        newer.advance(
            &RunDelta {
                pages: vec![1, 2, 3],
                new_records: 30,
                new_batches: 1,
                duplicates: 4,
            },
            now,
        );
        store.save_progress(&newer).await.unwrap();

        let mut stale = ProgressState::default();
        stale.advance(
            &RunDelta {
                pages: vec![1],
                new_records: 10,
                ..Default::default()
            },
            now,
        );
        store.save_progress(&stale).await.unwrap();

        let loaded = store.load_progress().await.unwrap();
        assert_eq!(loaded.scraped_pages.len(), 3);
        assert_eq!(loaded.total_records, 30);
        assert_eq!(loaded.duplicates_skipped, 4);

        let mut first = DedupLedger::new();
        first.add("a");
        store.save_ledger(&first).await.unwrap();
        store.save_ledger(&DedupLedger::new()).await.unwrap();
        assert!(store.load_ledger().await.contains("a"));
    }

    #[tokio::test]
    async fn test_accepts_legacy_metadata_fields() {
        let (_temp_dir, store) = create_temp_store();
        std::fs::write(
            store.metadata_path(),
            r#"{
                "last_page": 4,
                "scraped_pages": [1, 2, 3, 4],
                "total_records": 120,
                "total_batches": 2,
                "duplicates_skipped": 9,
                "last_updated": "2024-05-01 10:00:00",
                "last_scrape_range": "1-4"
            }"#,
        )
        .unwrap();
        let loaded = store.load_progress().await.unwrap();
        assert_eq!(loaded.last_page, 4);
        assert_eq!(loaded.total_records, 120);
        assert_eq!(loaded.total_batches, 2);
        assert_eq!(
            loaded.last_updated,
            Some("2024-05-01T10:00:00Z".parse().unwrap())
        );
        assert_eq!(loaded.last_scrape_range.as_deref(), Some("1-4"));
    }

    #[tokio::test]
    async fn test_accepts_metadata_without_newer_fields() {
        let (_temp_dir, store) = create_temp_store();
        std::fs::write(
            store.metadata_path(),
            r#"{"last_page": 4, "scraped_pages": [3, 1, 4], "total_records": 12}"#,
        )
        .unwrap();
        let loaded = store.load_progress().await.unwrap();
        assert_eq!(loaded.last_page, 4);
        assert_eq!(loaded.total_batches, 0);
        assert!(loaded.contains_page(3));
    }

    fn one_page_state() -> ProgressState {
        let mut state = ProgressState::default();
        state.advance(
            &RunDelta {
                pages: vec![1],
                new_records: 2,
                new_batches: 1,
                duplicates: 0,
            },
            Utc::now(),
        );
        state
    }

    #[tokio::test]
    async fn test_commit_leaves_ledger_alone_when_progress_cannot_be_staged() {
        let temp_dir = TempDir::new().unwrap();
        // A plain file where the metadata directory should be
        std::fs::write(temp_dir.path().join("blocked"), "").unwrap();
        let store = JsonFileStore::new(
            temp_dir.path().join("blocked").join("scrape_metadata.json"),
            temp_dir.path().join("property_hashes.json"),
        );

        let mut ledger = DedupLedger::new();
        ledger.add("https://a.example/1");
        let err = store.commit(&one_page_state(), &ledger).await.unwrap_err();

        assert!(matches!(err, ScoutError::PersistenceWrite { .. }));
        assert!(!store.ledger_path().exists());
        assert!(!store.ledger_path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_commit_rolls_ledger_back_when_progress_cannot_be_replaced() {
        let temp_dir = TempDir::new().unwrap();
        // Renaming a file over a directory fails after both files are staged
        let metadata_path = temp_dir.path().join("scrape_metadata.json");
        std::fs::create_dir(&metadata_path).unwrap();
        let store = JsonFileStore::new(&metadata_path, temp_dir.path().join("property_hashes.json"));

        let mut before = DedupLedger::new();
        before.add("https://a.example/1");
        store.save_ledger(&before).await.unwrap();

        let mut ledger = before.clone();
        ledger.add("https://a.example/2");
        let err = store.commit(&one_page_state(), &ledger).await.unwrap_err();

        assert!(matches!(err, ScoutError::PersistenceWrite { .. }));
        assert_eq!(store.load_ledger().await, before);
        assert!(!metadata_path.with_extension("json.tmp").exists());
    }
}
