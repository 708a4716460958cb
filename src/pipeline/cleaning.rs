//! Turn raw source records into typed listings, dropping unusable ones.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::models::{fields, identity_key, Furnished, Listing, Location, RawListing};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleaningRules {
    /// Prices at or above this are rejected
    pub max_price: u64,
    /// Keep records without an identity key
    pub keep_keyless: bool,
}

impl Default for CleaningRules {
    fn default() -> Self {
        Self {
            max_price: crate::config::DEFAULT_MAX_PRICE,
            keep_keyless: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    MissingPrice,
    PriceOutOfRange,
    MissingBedrooms,
    /// Zero bedrooms: plots, land, commercial space
    NoBedrooms,
    MissingUrl,
}

#[derive(Debug, Default)]
pub struct CleanOutcome {
    pub kept: Vec<Listing>,
    pub rejected: Vec<(RejectReason, Option<String>)>,
}

pub fn clean_listings(raw: Vec<RawListing>, rules: &CleaningRules) -> CleanOutcome {
    let now = Utc::now();
    let mut outcome = CleanOutcome::default();

    for record in raw {
        match clean_listing(&record, rules, now) {
            Ok(listing) => outcome.kept.push(listing),
            Err(reason) => {
                let url = identity_key(&record);
                debug!(?reason, url = url.as_deref().unwrap_or("-"), "Rejected listing");
                outcome.rejected.push((reason, url));
            }
        }
    }

    outcome
}

pub fn clean_listing(
    record: &RawListing,
    rules: &CleaningRules,
    scraped_at: DateTime<Utc>,
) -> Result<Listing, RejectReason> {
    let price = parse_amount(record.get(fields::PRICE))
        .ok_or(RejectReason::MissingPrice)?
        .round();
    // Bounds apply to the stored whole amount
    if price < 1.0 || price >= rules.max_price as f64 {
        return Err(RejectReason::PriceOutOfRange);
    }

    let bedrooms = parse_count(record.get(fields::BEDROOMS)).ok_or(RejectReason::MissingBedrooms)?;
    if bedrooms == 0 {
        return Err(RejectReason::NoBedrooms);
    }

    let url = match identity_key(record) {
        Some(url) => url,
        None if rules.keep_keyless => String::new(),
        None => return Err(RejectReason::MissingUrl),
    };

    Ok(Listing {
        title: record.text(fields::NAME).unwrap_or("Unknown").to_string(),
        url,
        price: price as u64,
        bedrooms,
        baths: parse_count(record.get(fields::BATHS)),
        location: Location {
            address: record.text(fields::LOCATION).unwrap_or("Unknown").to_string(),
            city: record.text(fields::CITY).map(str::to_string),
            state: record.text(fields::STATE).map(str::to_string),
        },
        description: record.text(fields::DESCRIPTION).unwrap_or_default().to_string(),
        features: parse_list(record.get(fields::FEATURES)),
        images: parse_list(record.get(fields::IMAGES)),
        furnished: Furnished::parse(record.text(fields::FURNISHED)),
        scraped_at,
        is_deal: false,
    })
}

/// Numeric or numeric-like value such as `"₦ 2,500,000"` or `"-300"`
pub fn parse_amount(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let negative = s.trim_start().starts_with('-');
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            let amount: f64 = digits.parse().ok()?;
            Some(if negative { -amount } else { amount })
        }
        _ => None,
    }
}

/// Non-negative whole count, such as `3`, `3.0` or `"3 beds"`
pub fn parse_count(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => {
            let n = n.as_f64()?;
            (n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64).then_some(n as u32)
        }
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// JSON array, or a string holding a serialized JSON array
pub fn parse_list(value: Option<&Value>) -> Vec<String> {
    let items = match value {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => match serde_json::from_str::<Vec<Value>>(s) {
            Ok(items) => items,
            Err(_) if !s.trim().is_empty() => vec![Value::String(s.trim().to_string())],
            Err(_) => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|s| !s.is_empty())
        .collect()
}
