use anyhow::Context;
use clap::Parser;
use listing_scout::controller::{RunController, RunOutcome, RunSettings};
use listing_scout::report;
use listing_scout::scrapers::HttpListingSource;
use listing_scout::state::{JsonFileStore, StateStore};
use listing_scout::writers::writers_from_config;
use listing_scout::Cli;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.to_config();
    let store = JsonFileStore::new(config.metadata_path(), config.ledger_path());

    let command = cli.command();
    let Some(mode) = command.run_mode() else {
        // History is read-only and never touches the listing source
        print!("{}", report::render_history(store.load_progress().await.as_ref()));
        return Ok(());
    };

    info!("🏠 Listing Scout");
    info!(data_dir = %config.data_dir.display(), ?mode, "Preparing run");

    let source = HttpListingSource::new(&config.source)?;
    let writers = writers_from_config(&config).context("Failed to open batch destinations")?;
    let controller = RunController::new(
        Box::new(source),
        Box::new(store),
        writers,
        RunSettings::from(&config),
    );

    let outcome = controller.run(mode).await?;
    print!("{}", report::render_outcome(&outcome));

    if let RunOutcome::Completed(summary) = &outcome {
        if let Some(err) = &summary.interrupted {
            error!(error = %err, "Run interrupted; partial progress was saved");
            std::process::exit(1);
        }
    }

    Ok(())
}
