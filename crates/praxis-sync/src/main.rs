use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use praxis_sync::config;
use praxis_sync::remote::HttpRemote;
use praxis_sync::store::LocalStore;
use praxis_sync::sync::{SyncCoordinator, SyncOutcome};

#[derive(Parser)]
#[command(name = "praxis-syncd", about = "Background sync daemon for the praxis client")]
struct Args {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single full sync and exit
    #[arg(long)]
    once: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    let config_path = match args.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let config = config::load(&config_path)?;

    let server_url = config
        .server
        .url
        .clone()
        .context("no server url configured; set [server] url in the config file")?;

    let store = LocalStore::open(&config.storage.database_path()?)?;
    let store = Arc::new(Mutex::new(store));
    let remote = Arc::new(HttpRemote::new(&server_url, config.server.api_token.clone()));
    let coordinator = SyncCoordinator::new(remote, store);

    tracing::info!("praxis-syncd starting, syncing against {server_url}");

    if args.once {
        let outcome = coordinator.run_full_sync().await?;
        report(outcome);
        return Ok(());
    }

    let mut full = tokio::time::interval(Duration::from_secs(config.sync.full_interval_seconds));
    let mut quick = tokio::time::interval(Duration::from_secs(config.sync.quick_interval_seconds));

    loop {
        tokio::select! {
            _ = full.tick() => {
                match coordinator.run_full_sync().await {
                    Ok(outcome) => report(outcome),
                    Err(err) => tracing::warn!("full sync failed: {err}"),
                }
            }

            _ = quick.tick() => {
                match coordinator.run_quick_sync().await {
                    Ok(outcome) => report(outcome),
                    Err(err) => tracing::warn!("quick sync failed: {err}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received shutdown signal, stopping praxis-syncd");
                break;
            }
        }
    }

    Ok(())
}

fn report(outcome: SyncOutcome) {
    match outcome {
        SyncOutcome::Completed { items_synced } => {
            tracing::debug!(items_synced, "sync pass finished");
        }
        SyncOutcome::Skipped => {
            tracing::debug!("sync pass skipped, another one was running");
        }
    }
}
