use crate::models::Listing;

/// A numbered slice of listings handed to the batch writers
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub number: u64,
    pub records: &'a [Listing],
}

/// Split listings into fixed-size batches numbered on from `previous_batches`.
pub fn plan_batches(listings: &[Listing], batch_size: usize, previous_batches: u64) -> Vec<Batch<'_>> {
    listings
        .chunks(batch_size.max(1))
        .zip(previous_batches + 1..)
        .map(|(records, number)| Batch { number, records })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Furnished, Location};
    use chrono::Utc;

    fn listings(n: usize) -> Vec<Listing> {
        (0..n)
            .map(|i| Listing {
                title: format!("Listing {}", i),
                url: format!("https://a.example/{}", i),
                price: 1_000,
                bedrooms: 1,
                baths: None,
                location: Location::default(),
                description: String::new(),
                features: vec![],
                images: vec![],
                furnished: Furnished::Unknown,
                scraped_at: Utc::now(),
                is_deal: false,
            })
            .collect()
    }

    #[test]
    fn test_batches_continue_numbering() {
        let items = listings(250);
        let batches = plan_batches(&items, 100, 7);
        let shape: Vec<_> = batches.iter().map(|b| (b.number, b.records.len())).collect();
        assert_eq!(shape, vec![(8, 100), (9, 100), (10, 50)]);
        assert_eq!(batches[2].records[0].url, "https://a.example/200");
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        assert!(plan_batches(&[], 100, 0).is_empty());
    }
}
