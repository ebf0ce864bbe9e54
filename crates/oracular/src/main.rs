//! Oracular launcher.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use oracular::cancel::{watch_for_interrupt, CancellationToken};
use oracular::harvest::{self, HarvestArgs, RunOutcome};
use oracular_logging::LogConfig;
use oracular_protocol::defaults;

#[derive(Parser, Debug)]
#[command(name = "oracular", about = "Functional-tag card database harvester")]
struct Cli {
    /// Enable verbose logging (debug detail on stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the card database: one tagged search per taxonomy entry
    Harvest {
        /// Taxonomy file listing the functional tags to query
        taxonomy: PathBuf,

        /// Output CSV path
        #[arg(short = 'o', long, default_value = defaults::DEFAULT_OUTPUT_PATH)]
        output: PathBuf,

        /// Checkpoint file used for resume support
        #[arg(short = 'c', long, default_value = defaults::DEFAULT_CHECKPOINT_PATH)]
        checkpoint: PathBuf,

        /// Minimum delay between API requests, in milliseconds
        #[arg(long, default_value_t = defaults::DEFAULT_REQUEST_DELAY_MS)]
        request_delay_ms: u64,

        /// Retry budget for transient and rate-limited fetches
        #[arg(long, default_value_t = defaults::DEFAULT_MAX_RETRIES)]
        max_retries: u32,

        /// API base URL
        #[arg(long, default_value = defaults::DEFAULT_BASE_URL)]
        base_url: String,

        /// Ignore an existing checkpoint and start from scratch
        #[arg(long)]
        fresh: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = oracular_logging::init_logging(LogConfig {
        app_name: "oracular",
        verbose: cli.verbose,
    }) {
        eprintln!("Failed to initialize logging: {err:#}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Commands::Harvest {
            taxonomy,
            output,
            checkpoint,
            request_delay_ms,
            max_retries,
            base_url,
            fresh,
        } => run_harvest_command(HarvestArgs {
            taxonomy,
            output,
            checkpoint,
            request_delay_ms,
            max_retries,
            base_url,
            fresh,
        }),
    }
}

fn run_harvest_command(args: HarvestArgs) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    runtime.spawn(watch_for_interrupt(cancel.clone()));

    match runtime.block_on(harvest::run(args, cancel)) {
        Ok(outcome) => exit_code(outcome),
        Err(err) => {
            error!(error = %format!("{err:#}"), "harvest failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Exit codes: 0 full success, 1 fatal error, 2 harvesting incomplete (rerun
/// to resume), 3 harvest complete but the database write failed.
fn exit_code(outcome: RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Complete => ExitCode::SUCCESS,
        RunOutcome::Incomplete => ExitCode::from(2),
        RunOutcome::WriteFailed => ExitCode::from(3),
    }
}
