//! Run command implementation.
//!
//! Drives the scheduled receiver with a JSON directory sink until Ctrl-C, or
//! runs a single cycle with `--once`.

use crate::receiver::{JsonDirSink, ReceiverFactory};
use crate::utils::config::{load_config, ReceiverConfig};
use anyhow::{Context, Result};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long a running cycle gets to wind down after Ctrl-C
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Arguments for the run command
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// TOML configuration file
    pub config: Option<PathBuf>,

    /// Overrides `include` from the file
    pub include: Option<String>,

    /// Overrides `initial_delay` from the file
    pub initial_delay: Option<Duration>,

    /// Overrides `collection_interval` from the file
    pub interval: Option<Duration>,

    /// Directory the batches are written to
    pub output_dir: PathBuf,

    /// Run a single cycle and exit
    pub once: bool,
}

/// Merge file configuration and command line overrides
pub fn resolve_config(args: &RunArgs) -> Result<ReceiverConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ReceiverConfig::default(),
    };

    if let Some(include) = &args.include {
        config.include = include.clone();
    }
    if let Some(delay) = args.initial_delay {
        config.initial_delay = delay;
    }
    if let Some(interval) = args.interval {
        config.collection_interval = interval;
    }

    config.validate().context("Invalid receiver configuration")?;
    Ok(config)
}

/// Execute the run command
///
/// **Public** - main entry point called from main.rs
pub async fn execute_run(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let factory = ReceiverFactory::new(config)?;

    let sink = Arc::new(JsonDirSink::new(&args.output_dir));
    factory.create_profiles_receiver(sink.clone());
    let receiver = factory.create_metrics_receiver(sink);

    if args.once {
        let report = tokio::task::spawn_blocking(move || {
            receiver.scrape_and_emit(&CancellationToken::new())
        })
        .await
        .context("Scrape cycle failed")?;

        info!("Scrape cycle finished: {}", report.summary());
        if !report.errors.is_empty() {
            error!("failed to scrape flight recorder files: {}", report.errors);
        }
        return Ok(());
    }

    receiver.start().context("Failed to start receiver")?;
    info!(
        "Writing batches to {}, press Ctrl-C to stop",
        args.output_dir.display()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down...");

    if let Err(e) = receiver.shutdown(SHUTDOWN_TIMEOUT).await {
        warn!("Receiver did not shut down cleanly: {}", e);
    }
    Ok(())
}
