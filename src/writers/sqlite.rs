use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::info;

use super::BatchWriter;
use crate::error::{Result, ScoutError};
use crate::models::Listing;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS listings (
    url          TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    address      TEXT NOT NULL,
    city         TEXT,
    state        TEXT,
    price        INTEGER NOT NULL,
    beds         INTEGER NOT NULL,
    baths        INTEGER,
    amenities    TEXT NOT NULL,
    images       TEXT NOT NULL,
    furnished    INTEGER NOT NULL,
    description  TEXT NOT NULL,
    batch_number INTEGER NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);
"#;

const UPSERT: &str = r#"
INSERT INTO listings (
    url, title, address, city, state, price, beds, baths,
    amenities, images, furnished, description, batch_number, created_at, updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
ON CONFLICT(url) DO UPDATE SET
    title = excluded.title,
    address = excluded.address,
    city = excluded.city,
    state = excluded.state,
    price = excluded.price,
    beds = excluded.beds,
    baths = excluded.baths,
    amenities = excluded.amenities,
    images = excluded.images,
    furnished = excluded.furnished,
    description = excluded.description,
    batch_number = excluded.batch_number,
    updated_at = excluded.updated_at
"#;

/// Upserts listings into a SQLite table keyed by URL.
///
/// Keyless listings cannot be upserted and are skipped.
pub struct SqliteBatchWriter {
    db: Mutex<Connection>,
    label: String,
}

impl SqliteBatchWriter {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, ":memory:".to_string())
    }

    fn with_connection(conn: Connection, label: String) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            db: Mutex::new(conn),
            label,
        })
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock(0)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn lock(&self, batch_number: u64) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| ScoutError::batch_write(batch_number, &self.label, e))
    }
}

#[async_trait]
impl BatchWriter for SqliteBatchWriter {
    async fn write(&self, batch_number: u64, records: &[Listing]) -> Result<String> {
        let mut conn = self.lock(batch_number)?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut written = 0usize;

        {
            let mut stmt = tx.prepare_cached(UPSERT)?;
            for listing in records.iter().filter(|l| !l.url.is_empty()) {
                stmt.execute(params![
                    listing.url,
                    listing.title,
                    listing.location.address,
                    listing.location.city,
                    listing.location.state,
                    listing.price as i64,
                    listing.bedrooms,
                    listing.baths,
                    serde_json::to_string(&listing.features)?,
                    serde_json::to_string(&listing.images)?,
                    listing.furnished.is_furnished(),
                    listing.description,
                    batch_number as i64,
                    now,
                ])?;
                written += 1;
            }
        }
        tx.commit()?;

        info!(batch_number, records = written, db = %self.label, "Upserted batch");
        Ok(format!("sqlite:{}#batch-{}", self.label, batch_number))
    }

    fn destination_name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writers::test_support::listing;

    #[tokio::test]
    async fn test_upsert_is_keyed_by_url() {
        let writer = SqliteBatchWriter::open_in_memory().unwrap();
        writer
            .write(1, &[listing("https://a.example/1", 100, 1), listing("https://a.example/2", 200, 2)])
            .await
            .unwrap();
        writer
            .write(2, &[listing("https://a.example/1", 150, 1)])
            .await
            .unwrap();

        assert_eq!(writer.count().unwrap(), 2);
        let conn = writer.db.lock().unwrap();
        let (price, batch): (i64, i64) = conn
            .query_row(
                "SELECT price, batch_number FROM listings WHERE url = ?1",
                ["https://a.example/1"],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!((price, batch), (150, 2));
    }

    #[tokio::test]
    async fn test_keyless_listings_are_skipped() {
        let writer = SqliteBatchWriter::open_in_memory().unwrap();
        writer.write(1, &[listing("", 100, 1)]).await.unwrap();
        assert_eq!(writer.count().unwrap(), 0);
    }
}
