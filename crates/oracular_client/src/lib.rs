//! Rate-limited client for the Scryfall card API.
//!
//! Every outbound request flows through one process-wide [`RateLimiter`], and
//! every response is classified explicitly at this boundary before the rest
//! of the harvester sees it: a page of cards, "no matches", or one of the
//! three failure classes in [`FetchError`]. Retry policy lives here too, so
//! callers only ever observe failures that have already exhausted their
//! retry budget (or will never succeed).

use std::time::Duration;

use thiserror::Error;

use oracular_protocol::defaults;

mod client;
mod rate_limit;
mod response;

pub use client::ScryfallClient;
pub use rate_limit::RateLimiter;
pub use response::TagPage;

/// Failure classes surfaced by the API client.
///
/// `Transient` and `RateLimitExceeded` have already consumed their retry
/// budget by the time a caller sees them; both leave the tag retryable on a
/// future run. `Permanent` is never retried.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Rate-limit responses persisted beyond the retry budget.
    #[error("rate limit exceeded after {attempts} attempts: {message}")]
    RateLimitExceeded { attempts: u32, message: String },

    /// Timeout, connection failure, or server error beyond the retry budget.
    #[error("transient fetch failure after {attempts} attempts: {message}")]
    Transient { attempts: u32, message: String },

    /// A request the remote API will never accept (malformed query,
    /// unrecognized tag).
    #[error("permanent fetch failure: {message}")]
    Permanent { message: String },
}

impl FetchError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, FetchError::Permanent { .. })
    }
}

/// Client construction knobs. Defaults mirror the documented Scryfall limits.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_delay: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::DEFAULT_BASE_URL.to_string(),
            request_delay: Duration::from_millis(defaults::DEFAULT_REQUEST_DELAY_MS),
            max_retries: defaults::DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(defaults::DEFAULT_BACKOFF_BASE_MS),
            backoff_cap: Duration::from_millis(defaults::DEFAULT_BACKOFF_CAP_MS),
            request_timeout: Duration::from_secs(defaults::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}
