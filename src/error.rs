//! Error types for listing-scout
//!
//! Corrupt or missing state files are not errors: the stores recover with
//! empty defaults and log a warning.

use thiserror::Error;

/// Result type alias for scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

#[derive(Error, Debug)]
pub enum ScoutError {
    /// Requested page range is inverted
    #[error("Invalid page range: start page {start} is greater than end page {end}")]
    InvalidRange { start: u32, end: u32 },

    /// Listing source failed to deliver a page (transport or parse failure)
    #[error("Failed to fetch page {page}: {message}")]
    SourceFetch { page: u32, message: String },

    /// Durable state could not be written; prior on-disk state is untouched
    #[error("Failed to persist {target}: {source}")]
    PersistenceWrite {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// A batch destination rejected a batch
    #[error("Failed to write batch {batch_number} to {destination}: {message}")]
    BatchWrite {
        batch_number: u64,
        destination: String,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScoutError {
    pub fn persistence(target: impl Into<String>, source: std::io::Error) -> Self {
        Self::PersistenceWrite {
            target: target.into(),
            source,
        }
    }

    pub fn batch_write(
        batch_number: u64,
        destination: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::BatchWrite {
            batch_number,
            destination: destination.into(),
            message: message.to_string(),
        }
    }
}
