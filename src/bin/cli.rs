//! food-ingest CLI
//!
//! Merges the Livsmedelsverket registry with USDA FoodData Central.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use food_ingest::{
    error::Result,
    models::Config,
    pipeline::{self, IngestOptions},
    services::{RegistryClient, RegistryEndpoints},
    storage::DatasetStore,
    utils::http::{self, HttpTransport},
};

/// food-ingest - Livsmedelsverket x USDA merger
#[derive(Parser, Debug)]
#[command(
    name = "food-ingest",
    version,
    about = "Merges the Livsmedelsverket food registry with USDA FoodData Central"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full ingestion: reference index, registry listing, batches
    Ingest {
        /// Output file (default: output.path from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only process the first N listed foods
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Download and index the reference datasets
    Reference,

    /// Walk the registry listing and count its foods
    List,

    /// Validate the configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Ingest { output, limit } => {
            config.validate()?;
            let downloads = http::create_download_client(&config.fetch)?;
            let store = DatasetStore::new(&config.reference.cache_dir, downloads);
            let index = pipeline::load_reference_index(&config.reference, &store).await?;

            let transport = Arc::new(HttpTransport::from_config(&config.fetch)?);
            let options = IngestOptions { output, limit };
            pipeline::run_ingest(&config, transport, Arc::new(index), &options).await?;
        }

        Command::Reference => {
            let downloads = http::create_download_client(&config.fetch)?;
            let store = DatasetStore::new(&config.reference.cache_dir, downloads);
            let index = pipeline::load_reference_index(&config.reference, &store).await?;
            log::info!("Indexed {} distinct descriptions", index.len());
        }

        Command::List => {
            let transport = Arc::new(HttpTransport::from_config(&config.fetch)?);
            let endpoints = RegistryEndpoints::new(&config.registry)?;
            let listing = RegistryClient::new(transport, endpoints).fetch_all().await?;
            log::info!(
                "{} foods over {} pages ({} items skipped)",
                listing.entities.len(),
                listing.pages,
                listing.skipped
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
