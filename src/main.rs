//! flightrec CLI
//!
//! Converts runtime flight recorder traces into profiles and gauge metrics,
//! either one file at a time or on a schedule.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::time::Duration;

use flightrec_receiver::commands::{
    display_version, execute_convert, execute_run, inspect_file, validate_args, ConvertArgs,
    RunArgs,
};
use flightrec_receiver::utils::config::parse_duration;

/// flightrec - flight recorder trace receiver
#[derive(Parser, Debug)]
#[command(name = "flightrec")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a single trace file
    Convert {
        /// Trace file (JSON lines event stream)
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for profiles.json and metrics.json
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Scrape trace files on a schedule until Ctrl-C
    Run {
        /// TOML configuration file
        #[arg(short, long, env = "FLIGHTREC_CONFIG")]
        config: Option<PathBuf>,

        /// Glob pattern selecting trace files
        #[arg(long)]
        include: Option<String>,

        /// Delay before the first scrape (e.g. 500ms, 1s)
        #[arg(long, value_parser = duration_arg)]
        initial_delay: Option<Duration>,

        /// Time between scrapes (e.g. 10s, 1m)
        #[arg(long, value_parser = duration_arg)]
        interval: Option<Duration>,

        /// Directory the batches are written to
        #[arg(short, long, default_value = "flightrec-out")]
        output_dir: PathBuf,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Print counts for a profiles or metrics JSON file
    Inspect {
        /// Path to JSON document
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn duration_arg(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Convert {
            input,
            output_dir,
            compact,
            summary,
        } => {
            let args = ConvertArgs {
                input,
                output_dir,
                pretty: !compact,
                print_summary: summary,
            };

            validate_args(&args)?;
            execute_convert(args)?;
        }

        Commands::Run {
            config,
            include,
            initial_delay,
            interval,
            output_dir,
            once,
        } => {
            let args = RunArgs {
                config,
                include,
                initial_delay,
                interval,
                output_dir,
                once,
            };

            let runtime =
                tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
            runtime.block_on(execute_run(args))?;
        }

        Commands::Inspect { file } => {
            inspect_file(&file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
