use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Field names a listing source fills in on every raw record
pub mod fields {
    pub const NAME: &str = "Property Name";
    pub const URL: &str = "URL";
    pub const PRICE: &str = "Price";
    pub const BEDROOMS: &str = "Bedrooms";
    pub const BATHS: &str = "Baths";
    pub const LOCATION: &str = "Location";
    pub const CITY: &str = "City";
    pub const STATE: &str = "State";
    pub const DESCRIPTION: &str = "Description";
    pub const FEATURES: &str = "Features";
    pub const IMAGES: &str = "Images";
    pub const FURNISHED: &str = "Furnished";
}

/// Anything carrying a listing identity key
pub trait Identified {
    fn identity(&self) -> Option<&str>;
}

/// Listing exactly as a source produced it: a map of named fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawListing(Map<String, Value>);

impl RawListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    /// Trimmed string value, `None` when missing or blank
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for RawListing {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl Identified for RawListing {
    fn identity(&self) -> Option<&str> {
        self.text(fields::URL)
    }
}

/// Derive the canonical identity key (the listing URL) of a raw record.
///
/// Absolute URLs are normalized (scheme and host lowercased, fragment dropped);
/// anything that does not parse is used as trimmed text.
pub fn identity_key(raw: &RawListing) -> Option<String> {
    let url = raw.identity()?;
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            Some(parsed.to_string())
        }
        Err(_) => Some(url.to_string()),
    }
}

/// Furnishing status advertised on a listing
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Furnished {
    Fully,
    Partially,
    Unfurnished,
    #[default]
    Unknown,
}

impl Furnished {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("fully furnished") | Some("furnished") => Self::Fully,
            Some("partially furnished") | Some("semi furnished") => Self::Partially,
            Some("unfurnished") | Some("not furnished") => Self::Unfurnished,
            _ => Self::Unknown,
        }
    }

    pub fn is_furnished(self) -> bool {
        matches!(self, Self::Fully | Self::Partially)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fully => "Fully Furnished",
            Self::Partially => "Partially Furnished",
            Self::Unfurnished => "Unfurnished",
            Self::Unknown => "Unknown",
        }
    }
}

/// Location information for a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Cleaned listing ready for batching
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub title: String,
    /// Canonical URL; empty only for keyless listings kept on purpose
    pub url: String,
    pub price: u64,
    pub bedrooms: u32,
    pub baths: Option<u32>,
    pub location: Location,
    pub description: String,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub furnished: Furnished,
    pub scraped_at: DateTime<Utc>,
    /// Priced below half the mean of its bedroom group; set after batching
    #[serde(skip)]
    pub is_deal: bool,
}

impl Identified for Listing {
    fn identity(&self) -> Option<&str> {
        Some(self.url.as_str()).filter(|u| !u.is_empty())
    }
}
