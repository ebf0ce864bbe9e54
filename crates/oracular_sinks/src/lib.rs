//! CSV sink for the final card database.
//!
//! One row per unique card, sorted by card identifier. Columns are the union
//! of every attribute observed across the card set, with the most-queried
//! fields pinned to the front and the tag set flattened into one delimited
//! column. The sink stages output in a temp file and promotes it with an
//! atomic rename, so a failed write never clobbers a previous database.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use oracular_protocol::CanonicalCard;

/// Errors raised while writing the final database. Fatal to the run, but the
/// checkpoint is preserved so a rerun retries only the write step.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{message}")]
    Csv {
        message: String,
        #[source]
        source: csv::Error,
    },
}

impl SinkError {
    fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        SinkError::Io {
            message: message.into(),
            source,
        }
    }

    fn csv(message: impl Into<String>, source: csv::Error) -> Self {
        SinkError::Csv {
            message: message.into(),
            source,
        }
    }
}

/// Columns pinned to the front of the output, most-queried first.
const PRIORITY_COLUMNS: &[&str] = &[
    "id",
    "name",
    "tags",
    "mana_cost",
    "cmc",
    "type_line",
    "oracle_text",
    "colors",
    "set",
    "rarity",
];

/// Always present: they come from the canonical record itself, not the
/// attribute map.
const INTRINSIC_COLUMNS: &[&str] = &["id", "name", "tags"];

pub struct CsvSink {
    final_path: PathBuf,
    temp_path: PathBuf,
    committed: bool,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let final_path: PathBuf = path.into();
        let file_name = final_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cards.csv".to_string());
        let temp_path = final_path.with_file_name(format!(".{file_name}.tmp"));
        Self {
            final_path,
            temp_path,
            committed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.final_path
    }

    /// Write every card and atomically promote the staged file.
    ///
    /// Returns the number of rows written.
    pub fn write(mut self, cards: &BTreeMap<String, CanonicalCard>) -> Result<u64, SinkError> {
        if cards.is_empty() {
            warn!("no cards to export, writing header-only database");
        }

        if let Some(parent) = self.final_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    SinkError::io(
                        format!("Failed to create output directory: {}", parent.display()),
                        err,
                    )
                })?;
            }
        }

        let columns = column_order(cards);

        let file = File::create(&self.temp_path).map_err(|err| {
            SinkError::io(
                format!("Failed to create temp CSV file: {}", self.temp_path.display()),
                err,
            )
        })?;
        let mut writer = csv::Writer::from_writer(file);

        writer
            .write_record(&columns)
            .map_err(|err| SinkError::csv("Failed to write CSV header", err))?;

        let mut rows = 0u64;
        // BTreeMap iteration order gives the sort-by-identifier guarantee.
        for card in cards.values() {
            let record: Vec<String> = columns.iter().map(|column| cell_value(card, column)).collect();
            writer
                .write_record(&record)
                .map_err(|err| SinkError::csv(format!("Failed to write row for card {}", card.id), err))?;
            rows += 1;
        }

        writer
            .flush()
            .map_err(|err| SinkError::io("Failed to flush CSV output", err))?;
        drop(writer);

        fs::rename(&self.temp_path, &self.final_path).map_err(|err| {
            SinkError::io(
                format!(
                    "Failed to rename {} -> {}",
                    self.temp_path.display(),
                    self.final_path.display()
                ),
                err,
            )
        })?;
        self.committed = true;

        info!(
            path = %self.final_path.display(),
            rows,
            columns = columns.len(),
            "committed card database"
        );
        Ok(rows)
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        // Cleanup staged output if the write never committed.
        if !self.committed && self.temp_path.exists() {
            let _ = fs::remove_file(&self.temp_path);
            warn!(path = %self.temp_path.display(), "cleaned up orphaned temp file");
        }
    }
}

/// Union of observed attribute columns, priority fields first, the rest
/// sorted. Deterministic for a given card set.
fn column_order(cards: &BTreeMap<String, CanonicalCard>) -> Vec<String> {
    let observed: BTreeSet<&str> = cards
        .values()
        .flat_map(|card| card.attrs.keys())
        .map(String::as_str)
        .collect();

    let mut columns: Vec<String> = Vec::new();
    for column in PRIORITY_COLUMNS {
        if INTRINSIC_COLUMNS.contains(column) || observed.contains(column) {
            columns.push((*column).to_string());
        }
    }
    for column in observed {
        if !PRIORITY_COLUMNS.contains(&column) && !INTRINSIC_COLUMNS.contains(&column) {
            columns.push(column.to_string());
        }
    }
    columns
}

fn cell_value(card: &CanonicalCard, column: &str) -> String {
    match column {
        "id" => card.id.clone(),
        "name" => card.name.clone(),
        "tags" => card.tags.iter().cloned().collect::<Vec<_>>().join(","),
        _ => match card.attrs.get(column) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(text)) => text.clone(),
            // Numbers, booleans, arrays, and objects all render as compact JSON.
            Some(value) => value.to_string(),
        },
    }
}
