pub mod csv_file;
pub mod json_file;
pub mod sqlite;

pub use csv_file::CsvBatchWriter;
pub use json_file::JsonBatchWriter;
pub use sqlite::SqliteBatchWriter;

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;

use crate::config::{OutputKind, ScoutConfig};
use crate::error::Result;
use crate::models::Listing;

/// Persists one batch of cleaned listings to a destination.
///
/// The run controller treats every destination the same way, whether it
/// writes a new file per batch or upserts rows into a store keyed by URL.
#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// Returns an identifier of where the batch landed
    async fn write(&self, batch_number: u64, records: &[Listing]) -> Result<String>;

    fn destination_name(&self) -> &str;
}

/// Build the writers selected in the configuration
pub fn writers_from_config(config: &ScoutConfig) -> Result<Vec<Box<dyn BatchWriter>>> {
    let mut writers: Vec<Box<dyn BatchWriter>> = Vec::new();
    for output in &config.outputs {
        match output {
            OutputKind::Csv => writers.push(Box::new(CsvBatchWriter::new(config.data_dir()))),
            OutputKind::Json => writers.push(Box::new(JsonBatchWriter::new(config.data_dir()))),
            OutputKind::Sqlite => {
                writers.push(Box::new(SqliteBatchWriter::open(config.sqlite_path())?))
            }
        }
    }
    Ok(writers)
}

/// `batch_007_20240101_120000.csv`
pub(crate) fn batch_file_name(batch_number: u64, extension: &str) -> String {
    format!(
        "batch_{:03}_{}.{}",
        batch_number,
        Utc::now().format("%Y%m%d_%H%M%S"),
        extension
    )
}

pub(crate) async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_file_name_is_zero_padded() {
        let name = batch_file_name(7, "csv");
        assert!(name.starts_with("batch_007_"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn test_writers_follow_configured_outputs() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = ScoutConfig::default()
            .with_data_dir(temp_dir.path())
            .with_outputs(vec![OutputKind::Csv, OutputKind::Sqlite]);
        let writers = writers_from_config(&config).unwrap();
        let names: Vec<_> = writers.iter().map(|w| w.destination_name().to_string()).collect();
        assert_eq!(names, vec!["csv", "sqlite"]);
    }
}
