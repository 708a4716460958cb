pub mod http;
pub mod traits;
pub mod types;

pub use http::HttpListingSource;
pub use traits::ListingSource;
pub use types::ListingSelectors;
