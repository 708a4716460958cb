use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::{batch_file_name, ensure_dir, BatchWriter};
use crate::error::{Result, ScoutError};
use crate::models::Listing;

/// Writes each batch to its own CSV file in the data directory
pub struct CsvBatchWriter {
    dir: PathBuf,
}

/// Flat CSV row; list fields are stored as JSON arrays
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Property Name")]
    title: &'a str,
    #[serde(rename = "URL")]
    url: &'a str,
    #[serde(rename = "Price")]
    price: u64,
    #[serde(rename = "Bedrooms")]
    bedrooms: u32,
    #[serde(rename = "Baths")]
    baths: Option<u32>,
    #[serde(rename = "Location")]
    address: &'a str,
    #[serde(rename = "City")]
    city: Option<&'a str>,
    #[serde(rename = "State")]
    state: Option<&'a str>,
    #[serde(rename = "Features")]
    features: String,
    #[serde(rename = "Images")]
    images: String,
    #[serde(rename = "Furnished")]
    furnished: &'static str,
    #[serde(rename = "Scraped At")]
    scraped_at: String,
}

impl<'a> CsvRow<'a> {
    fn from_listing(listing: &'a Listing) -> Result<Self> {
        Ok(Self {
            title: &listing.title,
            url: &listing.url,
            price: listing.price,
            bedrooms: listing.bedrooms,
            baths: listing.baths,
            address: &listing.location.address,
            city: listing.location.city.as_deref(),
            state: listing.location.state.as_deref(),
            features: serde_json::to_string(&listing.features)?,
            images: serde_json::to_string(&listing.images)?,
            furnished: listing.furnished.as_str(),
            scraped_at: listing.scraped_at.to_rfc3339(),
        })
    }
}

impl CsvBatchWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn encode(records: &[Listing]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for listing in records {
            writer.serialize(CsvRow::from_listing(listing)?)?;
        }
        writer
            .into_inner()
            .map_err(|e| ScoutError::Io(e.into_error()))
    }
}

#[async_trait]
impl BatchWriter for CsvBatchWriter {
    async fn write(&self, batch_number: u64, records: &[Listing]) -> Result<String> {
        ensure_dir(&self.dir).await?;
        let path = self.dir.join(batch_file_name(batch_number, "csv"));
        let bytes = Self::encode(records)?;
        tokio::fs::write(&path, bytes).await?;

        let destination = path.display().to_string();
        info!(batch_number, records = records.len(), path = %destination, "Saved CSV batch");
        Ok(destination)
    }

    fn destination_name(&self) -> &str {
        "csv"
    }
}
