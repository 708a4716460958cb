pub mod batching;
pub mod cleaning;
pub mod deals;

pub use batching::{plan_batches, Batch};
pub use cleaning::{clean_listings, CleanOutcome, CleaningRules, RejectReason};
pub use deals::{average_price_by_bedrooms, flag_deals, top_deals};
