//! Backup Plugin - Main entry point
//!
//! Runs a single backup or restore request read from a JSON file against the
//! local media agent.

use anyhow::{Context, Result};
use backup_plugin::{
    config::Config,
    model::{BackupRequest, RestoreRequest},
    plugin::samplefs::FsDataMover,
    services::LocalMediaAgent,
    staging::StagingAreaManager,
    status::TracingStatus,
    utils, Orchestrator,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a backup request
    Backup {
        /// JSON backup request
        #[arg(value_name = "REQUEST")]
        request: PathBuf,
    },
    /// Run a restore request
    Restore {
        /// JSON restore request
        #[arg(value_name = "REQUEST")]
        request: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        Config::default()
    };

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!(
        "Starting backup-plugin v{} (plugin: {})",
        env!("CARGO_PKG_VERSION"),
        config.plugin.name
    );

    // Stop at the next phase boundary on Ctrl+C
    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C, cancelling the running operation");
            signal_token.cancel();
        }
    });

    let agent = Arc::new(LocalMediaAgent::new(
        &config.media.store_dir,
        &config.plugin.name,
    ));
    let mover = FsDataMover::new(config.backup.follow_symlinks).with_staging(config.backup.staged);
    let orchestrator = Orchestrator::new(
        StagingAreaManager::new(&config.plugin.staging_root, &config.plugin.name),
        Arc::new(mover),
        agent.clone(),
        agent,
    )
    .with_cancel(cancel_token);

    let status = TracingStatus;
    let outcome = match &args.command {
        Command::Backup { request } => {
            let mut request = BackupRequest::from_json(&read_request(request)?)?;
            if request.app_host.is_empty() {
                request.app_host = local_hostname();
            }
            orchestrator.backup(&status, &request).await
        }
        Command::Restore { request } => {
            let mut request = RestoreRequest::from_json(&read_request(request)?)?;
            if request.app_host.is_empty() {
                request.app_host = local_hostname();
            }
            orchestrator.restore(&status, &request).await
        }
    };

    if let Err(e) = outcome {
        tracing::error!("Operation failed ({}): {}", e.kind().status_code(), e);
        std::process::exit(1);
    }

    tracing::info!("Operation completed");
    Ok(())
}

fn read_request(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Hostname recorded as the source client when the request leaves it empty
fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "localhost".to_string())
}
