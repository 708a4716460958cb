use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use super::{batch_file_name, ensure_dir, BatchWriter};
use crate::error::Result;
use crate::models::Listing;

/// Writes each batch as a pretty-printed JSON array
pub struct JsonBatchWriter {
    dir: PathBuf,
}

impl JsonBatchWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl BatchWriter for JsonBatchWriter {
    async fn write(&self, batch_number: u64, records: &[Listing]) -> Result<String> {
        ensure_dir(&self.dir).await?;
        let path = self.dir.join(batch_file_name(batch_number, "json"));
        let json = serde_json::to_string_pretty(records)?;
        tokio::fs::write(&path, json).await?;

        let destination = path.display().to_string();
        info!(batch_number, records = records.len(), path = %destination, "Saved JSON batch");
        Ok(destination)
    }

    fn destination_name(&self) -> &str {
        "json"
    }
}
