//! Market analysis: mean price per bedroom count and deal detection.

use std::collections::BTreeMap;

use crate::models::Listing;

/// A listing is a deal when its price is strictly below this share of its
/// bedroom group's mean price.
pub const DEAL_THRESHOLD: f64 = 0.5;

pub fn average_price_by_bedrooms(listings: &[Listing]) -> BTreeMap<u32, f64> {
    let mut sums: BTreeMap<u32, (f64, u64)> = BTreeMap::new();
    for listing in listings {
        let entry = sums.entry(listing.bedrooms).or_insert((0.0, 0));
        entry.0 += listing.price as f64;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(bedrooms, (total, count))| (bedrooms, total / count as f64))
        .collect()
}

/// Set `is_deal` on every listing and return the group means used.
pub fn flag_deals(listings: &mut [Listing]) -> BTreeMap<u32, f64> {
    let averages = average_price_by_bedrooms(listings);
    for listing in listings.iter_mut() {
        listing.is_deal = averages
            .get(&listing.bedrooms)
            .is_some_and(|mean| (listing.price as f64) < mean * DEAL_THRESHOLD);
    }
    averages
}

/// Cheapest deals first
pub fn top_deals(listings: &[Listing], limit: usize) -> Vec<Listing> {
    let mut deals: Vec<Listing> = listings.iter().filter(|l| l.is_deal).cloned().collect();
    deals.sort_by_key(|l| l.price);
    deals.truncate(limit);
    deals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Furnished, Location};
    use chrono::Utc;

    fn listing(url: &str, price: u64, bedrooms: u32) -> Listing {
        Listing {
            title: url.to_string(),
            url: url.to_string(),
            price,
            bedrooms,
            baths: None,
            location: Location::default(),
            description: String::new(),
            features: vec![],
            images: vec![],
            furnished: Furnished::Unknown,
            scraped_at: Utc::now(),
            is_deal: false,
        }
    }

    #[test]
    fn test_exactly_half_of_mean_is_not_a_deal() {
        // mean 200, half 100
        let mut listings = vec![listing("a", 100, 2), listing("b", 300, 2)];
        let averages = flag_deals(&mut listings);
        assert_eq!(averages[&2], 200.0);
        assert!(!listings[0].is_deal);
        assert!(!listings[1].is_deal);
    }

    #[test]
    fn test_below_half_of_mean_is_a_deal() {
        // mean 100, 49 is 49% of it
        let mut listings = vec![listing("a", 49, 3), listing("b", 151, 3)];
        flag_deals(&mut listings);
        assert!(listings[0].is_deal);
        assert!(!listings[1].is_deal);
    }

    #[test]
    fn test_groups_are_independent() {
        let mut listings = vec![
            listing("a", 10, 1),
            listing("b", 90, 1),
            listing("c", 1_000, 4),
            listing("d", 1_000, 4),
        ];
        let averages = flag_deals(&mut listings);
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[&1], 50.0);
        assert!(listings[0].is_deal);
        assert!(!listings[2].is_deal && !listings[3].is_deal);
    }

    #[test]
    fn test_top_deals_sorted_and_limited() {
        let mut listings = vec![
            listing("a", 20, 1),
            listing("b", 10, 1),
            listing("c", 1_000, 1),
            listing("d", 1_000, 1),
        ];
        flag_deals(&mut listings);
        let deals = top_deals(&listings, 1);
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].url, "b");
    }
}
