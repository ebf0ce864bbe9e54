//! The harvester driver loop.
//!
//! Walks the taxonomy tag by tag: harvest, merge, commit, repeat. Tag-level
//! failures are logged and skipped, never fatal; the tag stays unprocessed in
//! the checkpoint so a later run retries it. Only checkpoint I/O errors and
//! the final database write can end the run early.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use oracular_client::{ClientConfig, FetchError, ScryfallClient};
use oracular_protocol::{load_taxonomy, Checkpoint, RawCard};
use oracular_sinks::CsvSink;
use oracular_store::CheckpointStore;

use crate::cancel::CancellationToken;

/// Seam between the driver loop and the remote API, so the loop is testable
/// against a scripted source.
#[allow(async_fn_in_trait)]
pub trait TagSource {
    /// Fetch every raw card record matching one tag.
    async fn harvest_tag(&self, tag: &str) -> Result<Vec<RawCard>, FetchError>;

    /// Total outbound requests issued so far.
    fn requests_made(&self) -> u64;
}

impl TagSource for ScryfallClient {
    async fn harvest_tag(&self, tag: &str) -> Result<Vec<RawCard>, FetchError> {
        ScryfallClient::harvest_tag(self, tag).await
    }

    fn requests_made(&self) -> u64 {
        ScryfallClient::requests_made(self)
    }
}

/// Where the driver loop ended up; maps onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every tag processed, database written, checkpoint cleared.
    Complete,
    /// Interrupted, or some tags left unprocessed; checkpoint kept so the
    /// next run resumes.
    Incomplete,
    /// Every tag processed but the database could not be written; checkpoint
    /// kept so a rerun retries only the write.
    WriteFailed,
}

/// End-of-run accounting for the user-facing summary.
#[derive(Debug, Default)]
pub struct HarvestReport {
    pub tags_total: usize,
    pub tags_processed_total: usize,
    pub tags_processed_run: usize,
    pub tags_skipped: Vec<String>,
    pub interrupted: bool,
    pub unique_cards: usize,
    pub requests: u64,
}

#[derive(Debug)]
pub struct HarvestArgs {
    pub taxonomy: PathBuf,
    pub output: PathBuf,
    pub checkpoint: PathBuf,
    pub request_delay_ms: u64,
    pub max_retries: u32,
    pub base_url: String,
    pub fresh: bool,
}

/// Execute the harvest command end to end.
pub async fn run(args: HarvestArgs, cancel: CancellationToken) -> Result<RunOutcome> {
    let started = Instant::now();

    let taxonomy = load_taxonomy(&args.taxonomy)?;
    info!(
        tags = taxonomy.len(),
        path = %args.taxonomy.display(),
        "loaded taxonomy"
    );

    let store = CheckpointStore::new(&args.checkpoint);
    let mut checkpoint = if args.fresh {
        info!("ignoring any existing checkpoint (--fresh)");
        Checkpoint::default()
    } else {
        store.load()
    };

    let client = ScryfallClient::new(ClientConfig {
        base_url: args.base_url.clone(),
        request_delay: Duration::from_millis(args.request_delay_ms),
        max_retries: args.max_retries,
        ..ClientConfig::default()
    })?;

    let (outcome, report) = run_harvest(
        &client,
        &store,
        &mut checkpoint,
        &taxonomy,
        &args.output,
        &cancel,
    )
    .await?;

    print_summary(&report, outcome, &args.output, started.elapsed());
    Ok(outcome)
}

/// The driver loop proper: for each unprocessed tag, harvest and commit;
/// afterwards write the database and clear the checkpoint on full success.
pub async fn run_harvest<S: TagSource>(
    source: &S,
    store: &CheckpointStore,
    checkpoint: &mut Checkpoint,
    taxonomy: &[String],
    output: &Path,
    cancel: &CancellationToken,
) -> Result<(RunOutcome, HarvestReport)> {
    let mut report = HarvestReport {
        tags_total: taxonomy.len(),
        ..HarvestReport::default()
    };

    for (index, tag) in taxonomy.iter().enumerate() {
        if checkpoint.is_processed(tag) {
            continue;
        }
        if cancel.is_cancelled() {
            warn!("stopping before next tag; progress is checkpointed");
            report.interrupted = true;
            break;
        }

        info!(tag, index = index + 1, total = taxonomy.len(), "harvesting tag");
        match source.harvest_tag(tag).await {
            Ok(records) => {
                let fetched = records.len();
                let stats = store
                    .commit_tag(checkpoint, tag, records)
                    .with_context(|| format!("Failed to commit checkpoint after tag '{tag}'"))?;
                report.tags_processed_run += 1;
                info!(
                    tag,
                    fetched,
                    new_cards = stats.new_cards,
                    tagged_cards = stats.tagged_cards,
                    total_cards = checkpoint.cards.len(),
                    "tag committed"
                );
            }
            Err(err) if err.is_permanent() => {
                warn!(tag, error = %err, "tag rejected by the API, skipping for this run");
                report.tags_skipped.push(tag.clone());
            }
            Err(err) => {
                warn!(tag, error = %err, "tag failed after retries, leaving for a future run");
                report.tags_skipped.push(tag.clone());
            }
        }
    }

    report.tags_processed_total = taxonomy
        .iter()
        .filter(|tag| checkpoint.is_processed(tag))
        .count();
    report.unique_cards = checkpoint.cards.len();
    report.requests = source.requests_made();

    if report.interrupted {
        return Ok((RunOutcome::Incomplete, report));
    }

    let all_processed = report.tags_processed_total == report.tags_total;

    // Every tag has been visited. Write the database even when some tags
    // were skipped this run, so partial progress is inspectable.
    match CsvSink::new(output).write(&checkpoint.cards) {
        Ok(rows) => info!(rows, path = %output.display(), "database written"),
        Err(err) => {
            error!(error = %err, "failed to write database; checkpoint preserved");
            let outcome = if all_processed {
                RunOutcome::WriteFailed
            } else {
                RunOutcome::Incomplete
            };
            return Ok((outcome, report));
        }
    }

    if all_processed {
        store.clear().context("Failed to clear checkpoint")?;
        Ok((RunOutcome::Complete, report))
    } else {
        Ok((RunOutcome::Incomplete, report))
    }
}

fn print_summary(report: &HarvestReport, outcome: RunOutcome, output: &Path, elapsed: Duration) {
    println!();
    println!("Harvest summary");
    println!(
        "  Tags processed:  {}/{} ({} this run)",
        report.tags_processed_total, report.tags_total, report.tags_processed_run
    );
    if !report.tags_skipped.is_empty() {
        println!(
            "  Tags skipped:    {} ({})",
            report.tags_skipped.len(),
            report.tags_skipped.join(", ")
        );
    }
    println!("  Unique cards:    {}", report.unique_cards);
    println!("  API requests:    {}", report.requests);
    println!("  Elapsed:         {}", format_elapsed(elapsed));

    match outcome {
        RunOutcome::Complete => {
            println!("  Output:          {}", output.display());
        }
        RunOutcome::Incomplete if report.interrupted => {
            println!("  Interrupted: progress saved, rerun to resume.");
        }
        RunOutcome::Incomplete => {
            println!("  Some tags are unprocessed; rerun to retry them.");
        }
        RunOutcome::WriteFailed => {
            println!("  Database write failed; checkpoint kept, rerun to retry the export.");
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}
