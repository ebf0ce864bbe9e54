//! Canonical default values shared across the harvester crates.

pub const DEFAULT_BASE_URL: &str = "https://api.scryfall.com";
pub const DEFAULT_OUTPUT_PATH: &str = "data/cards_database.csv";
pub const DEFAULT_CHECKPOINT_PATH: &str = "data/harvest_checkpoint.json";

/// Minimum spacing between outbound API requests, per the Scryfall
/// rate-limit guidance (50-100ms).
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 100;

/// Retry budget for transient and rate-limited page fetches.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 30_000;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const USER_AGENT: &str = concat!("oracular/", env!("CARGO_PKG_VERSION"));
