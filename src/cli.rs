//! Command-line surface.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{OutputKind, RunMode, ScoutConfig, SourceConfig, DEFAULT_DATA_DIR};

#[derive(Parser, Debug)]
#[command(author, version, about = "Incremental property listing scraper with deduplication and resume")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding batches, progress metadata and the dedup ledger
    #[arg(long, global = true, env = "SCOUT_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Search results URL of the listing source
    #[arg(long, global = true, env = "SCOUT_SOURCE_URL")]
    pub source_url: Option<String>,

    /// Pause between page fetches, in milliseconds
    #[arg(long, global = true, env = "SCOUT_PAGE_DELAY_MS", default_value_t = 2000)]
    pub page_delay_ms: u64,

    /// Records per batch
    #[arg(long, global = true, env = "SCOUT_BATCH_SIZE", default_value_t = 100)]
    pub batch_size: usize,

    /// Batch destinations (repeatable or comma separated)
    #[arg(long, global = true, env = "SCOUT_OUTPUT", value_enum, value_delimiter = ',', default_value = "csv")]
    pub output: Vec<OutputArg>,

    /// SQLite database for the sqlite output (defaults to <data-dir>/listings.db)
    #[arg(long, global = true, env = "SCOUT_SQLITE_PATH")]
    pub sqlite_path: Option<PathBuf>,

    /// Keep listings that have no URL; they bypass deduplication
    #[arg(long, global = true, env = "SCOUT_KEEP_KEYLESS")]
    pub keep_keyless: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Scrape an inclusive page range, skipping pages already scraped
    Scrape { start: u32, end: u32 },
    /// Re-scrape an inclusive page range even if already scraped
    Force { start: u32, end: u32 },
    /// Continue from the last scraped page
    Resume,
    /// Show scraping progress
    History,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputArg {
    Csv,
    Json,
    Sqlite,
}

impl From<OutputArg> for OutputKind {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Csv => OutputKind::Csv,
            OutputArg::Json => OutputKind::Json,
            OutputArg::Sqlite => OutputKind::Sqlite,
        }
    }
}

impl Commands {
    /// Run mode for scraping commands; `None` for read-only ones
    pub fn run_mode(&self) -> Option<RunMode> {
        match *self {
            Commands::Scrape { start, end } => Some(RunMode::Range { start, end }),
            Commands::Force { start, end } => Some(RunMode::Force { start, end }),
            Commands::Resume => Some(RunMode::Resume),
            Commands::History => None,
        }
    }
}

impl Cli {
    /// Without a subcommand, scrape pages 1 to 5
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Scrape { start: 1, end: 5 })
    }

    pub fn to_config(&self) -> ScoutConfig {
        let mut source = SourceConfig::default();
        if let Some(url) = &self.source_url {
            source.base_url = url.clone();
        }

        let mut outputs: Vec<OutputKind> = Vec::new();
        for kind in self.output.iter().copied().map(OutputKind::from) {
            if !outputs.contains(&kind) {
                outputs.push(kind);
            }
        }

        ScoutConfig {
            source,
            sqlite_path: self.sqlite_path.clone(),
            ..ScoutConfig::default()
        }
        .with_data_dir(&self.data_dir)
        .with_page_delay(Duration::from_millis(self.page_delay_ms))
        .with_batch_size(self.batch_size)
        .with_outputs(outputs)
        .with_keep_keyless(self.keep_keyless)
    }
}
