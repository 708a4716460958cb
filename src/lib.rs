//! listing-scout: incremental property listing scraper.
//!
//! Pulls paginated listings from a [`scrapers::ListingSource`], drops listings
//! already seen in earlier runs, writes the rest in numbered batches and keeps
//! resumable progress in a [`state::StateStore`].

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod scrapers;
pub mod state;
pub mod writers;

pub use cli::{Cli, Commands};
pub use config::{RunMode, ScoutConfig};
pub use controller::{RunController, RunOutcome, RunSettings, RunSummary};
pub use error::{Result, ScoutError};
