//! Metadata depot binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use depot_server::{DepotState, load_config, scheduler};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Depot - metadata store and notification queue
#[derive(Parser, Debug)]
#[command(name = "depotd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "DEPOT_CONFIG",
        default_value = "config/depot.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create indexes and run the queue observers and housekeeping (default)
    Run,
    /// Create every missing index
    CreateIndexes,
    /// List the managed collections
    ListCollections,
    /// List the indexes present in the store
    ListIndexes,
    /// Drop the index of a collection, keeping its documents
    DropIndex {
        /// Collection name, e.g. `entities`
        collection: String,
    },
    /// Print the number of pending notifications
    QueueSize,
    /// Purge old notification history and consolidate query metrics
    Housekeep,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&cli.config)?;
    let state = DepotState::open(config).await?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(state).await?,
        Commands::CreateIndexes => {
            for index in state.bootstrap().await? {
                println!("{index}");
            }
        }
        Commands::ListCollections => {
            for collection in state.admin.get_all_collections() {
                println!("{collection}");
            }
        }
        Commands::ListIndexes => {
            let indexes = state
                .admin
                .get_all_indexes()
                .await
                .context("failed to list indexes")?;
            for index in indexes {
                println!("{index}");
            }
        }
        Commands::DropIndex { collection } => {
            let index = state
                .admin
                .delete_index(&collection)
                .await
                .with_context(|| format!("failed to drop index of {collection}"))?;
            println!("{index}");
        }
        Commands::QueueSize => {
            let size = state
                .notifications
                .queue_size()
                .await
                .context("failed to read queue size")?;
            println!("{size}");
        }
        Commands::Housekeep => {
            let report = state.housekeep().await?;
            println!(
                "notifications deleted: {}, metrics consolidated: {}",
                report.notifications, report.metrics
            );
        }
    }
    Ok(())
}

async fn run(state: DepotState) -> Result<()> {
    tracing::info!("Depot v{}", env!("CARGO_PKG_VERSION"));

    let indexes = state.bootstrap().await?;
    tracing::info!(count = indexes.len(), "Indexes ready");

    let handles = scheduler::spawn_all(&state);
    tracing::info!(schedules = handles.len(), "Schedules running");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}
