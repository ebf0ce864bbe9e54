//! Shared logging utilities for Oracular binaries.

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "oracular=info,oracular_client=info,oracular_store=info";
const VERBOSE_LOG_FILTER: &str = "oracular=debug,oracular_client=debug,oracular_store=debug";

/// A log file over this size is rotated (one `.1` backup kept) on startup.
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration shared by Oracular binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Initialize tracing with a file writer under the Oracular home directory
/// and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let log_file = open_log_file(log_dir, config.app_name)
        .context("Failed to open log file")?;

    let default_filter = if config.verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    Ok(())
}

/// Get the Oracular home directory: ~/.oracular
pub fn oracular_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("ORACULAR_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".oracular")
}

/// Get the logs directory: ~/.oracular/logs
pub fn logs_dir() -> PathBuf {
    oracular_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Open the append-mode log file, rotating an oversized one to `.1` first.
fn open_log_file(dir: PathBuf, app_name: &str) -> Result<File> {
    let path = dir.join(format!("{}.log", sanitize_name(app_name)));

    if let Ok(metadata) = fs::metadata(&path) {
        if metadata.len() > MAX_LOG_FILE_SIZE {
            let backup = path.with_extension("log.1");
            fs::rename(&path, &backup).with_context(|| {
                format!("Failed to rotate log file: {}", path.display())
            })?;
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;
    Ok(file)
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sanitizes_app_names() {
        assert_eq!(sanitize_name("oracular"), "oracular");
        assert_eq!(sanitize_name("oracular harvest/2"), "oracular_harvest_2");
    }

    #[test]
    fn oversized_log_is_rotated_on_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, vec![b'x'; (MAX_LOG_FILE_SIZE + 1) as usize]).unwrap();

        open_log_file(dir.path().to_path_buf(), "app").unwrap();

        assert!(dir.path().join("app.log.1").exists());
        assert!(fs::metadata(&path).unwrap().len() < MAX_LOG_FILE_SIZE);
    }
}
