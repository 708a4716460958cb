use crate::models::RawListing;
use anyhow::Result;
use async_trait::async_trait;

/// Common trait for all paginated listing sources
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one results page.
    ///
    /// An empty vector means the source has no more data; an error means the
    /// page could not be fetched or parsed.
    async fn fetch_page(&self, page: u32) -> Result<Vec<RawListing>>;

    /// Get the name of the listing source
    fn source_name(&self) -> &str;
}
