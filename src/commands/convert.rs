//! Convert command implementation.
//!
//! The convert command:
//! 1. Opens a single trace file
//! 2. Converts it into profiles and metrics
//! 3. Writes both documents into the output directory

use crate::output::{write_metrics, write_profiles};
use crate::receiver::convert_file;
use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Arguments for the convert command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    /// Trace file to convert
    pub input: PathBuf,

    /// Directory receiving `profiles.json` and `metrics.json`
    pub output_dir: PathBuf,

    /// Pretty-print the JSON documents
    pub pretty: bool,

    /// Print a text summary to stdout
    pub print_summary: bool,
}

impl Default for ConvertArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_dir: PathBuf::from("."),
            pretty: true,
            print_summary: false,
        }
    }
}

/// Validate convert arguments before doing any work
pub fn validate_args(args: &ConvertArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        bail!("Input trace file is required");
    }
    if !args.input.is_file() {
        bail!("Input trace file not found: {}", args.input.display());
    }
    if args.output_dir.is_file() {
        bail!(
            "Output directory is an existing file: {}",
            args.output_dir.display()
        );
    }
    Ok(())
}

/// Execute the convert command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Trace file cannot be opened or decoded
/// * Output files cannot be written
pub fn execute_convert(args: ConvertArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Converting trace: {}", args.input.display());
    let conversion = convert_file(&args.input, &CancellationToken::new())
        .context("Failed to convert trace file")?;
    debug!("{}", conversion.stats.summary());

    let profiles_path = args.output_dir.join("profiles.json");
    write_profiles(&conversion.profiles, &profiles_path, args.pretty)
        .context("Failed to write profiles JSON")?;
    info!("✓ Profiles written to: {}", profiles_path.display());

    let metrics_path = args.output_dir.join("metrics.json");
    write_metrics(&conversion.metrics, &metrics_path, args.pretty)
        .context("Failed to write metrics JSON")?;
    info!("✓ Metrics written to: {}", metrics_path.display());

    if args.print_summary {
        let stats = &conversion.stats;
        println!("\n{}", "=".repeat(60));
        println!("CONVERSION SUMMARY");
        println!("{}", "=".repeat(60));
        println!("Trace:            {}", args.input.display());
        println!("Events:           {}", stats.events);
        println!("Profiles:         {}", conversion.profiles.profile_count());
        println!("  finalized:      {}", stats.profiles_finalized);
        println!("  left open:      {}", stats.profiles_left_open);
        println!("  discarded:      {}", stats.profiles_discarded);
        println!("Samples:          {}", stats.samples);
        println!("Metrics:          {}", conversion.metrics.metric_count());
        println!("Metric points:    {}", stats.metric_points);
        println!("Dropped (no sync): {}", stats.dropped_before_sync);
        println!(
            "Unique stacks:    {}",
            conversion.profiles.dictionary.stack_table.len().saturating_sub(1)
        );
        println!("{}", "=".repeat(60));
    }

    info!(
        "Conversion completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
