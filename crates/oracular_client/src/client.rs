//! The Scryfall client: retrying page fetches and per-tag pagination.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use oracular_protocol::{defaults, RawCard};

use crate::rate_limit::RateLimiter;
use crate::response::{classify_response, PageOutcome, TagPage};
use crate::{ClientConfig, FetchError};

pub struct ScryfallClient {
    http: reqwest::Client,
    limiter: RateLimiter,
    config: ClientConfig,
    requests_made: AtomicU64,
}

impl ScryfallClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(defaults::USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            limiter: RateLimiter::new(config.request_delay),
            config,
            requests_made: AtomicU64::new(0),
        })
    }

    /// Total requests sent so far, retries included.
    pub fn requests_made(&self) -> u64 {
        self.requests_made.load(Ordering::Relaxed)
    }

    /// Harvest every card matching one functional tag, following pagination
    /// until the API reports no further pages.
    ///
    /// There is no intra-tag resume: a failure partway through discards the
    /// pages already fetched and surfaces as one tag-level error.
    pub async fn harvest_tag(&self, tag: &str) -> Result<Vec<RawCard>, FetchError> {
        let mut url = self.search_url(tag);
        let mut cards: Vec<RawCard> = Vec::new();

        loop {
            let page = match self.fetch_page(&url).await? {
                Some(page) => page,
                None => break,
            };

            let total = page.total_cards;
            cards.extend(page.data.into_iter().map(|card| RawCard {
                tag: tag.to_string(),
                card,
            }));
            debug!(tag, fetched = cards.len(), total, "fetched search page");

            match (page.has_more, page.next_page) {
                (true, Some(next)) => url = next,
                _ => break,
            }
        }

        Ok(cards)
    }

    fn search_url(&self, tag: &str) -> String {
        format!(
            "{}/cards/search?q=otag:{}",
            self.config.base_url.trim_end_matches('/'),
            tag
        )
    }

    /// Fetch one page, retrying transient and rate-limit failures with
    /// backoff until the budget runs out. `Ok(None)` means the query matched
    /// zero cards.
    async fn fetch_page(&self, url: &str) -> Result<Option<TagPage>, FetchError> {
        let mut attempts: u32 = 0;

        loop {
            self.limiter.acquire().await;
            self.requests_made.fetch_add(1, Ordering::Relaxed);
            attempts += 1;

            let outcome = self.send_request(url).await;

            match outcome {
                PageOutcome::Page(page) => return Ok(Some(page)),
                PageOutcome::NoMatches => return Ok(None),
                PageOutcome::Permanent { message } => {
                    return Err(FetchError::Permanent { message });
                }
                PageOutcome::RateLimited { retry_after } => {
                    if attempts > self.config.max_retries {
                        return Err(FetchError::RateLimitExceeded {
                            attempts,
                            message: format!("GET {url}"),
                        });
                    }
                    let delay = retry_after.unwrap_or_else(|| self.backoff_delay(attempts));
                    warn!(url, attempts, ?delay, "rate limited, backing off");
                    tokio::time::sleep(delay).await;
                }
                PageOutcome::Transient { message } => {
                    if attempts > self.config.max_retries {
                        return Err(FetchError::Transient { attempts, message });
                    }
                    let delay = self.backoff_delay(attempts);
                    warn!(url, attempts, ?delay, %message, "transient failure, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn send_request(&self, url: &str) -> PageOutcome {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                return PageOutcome::Transient {
                    message: format!("request failed: {err}"),
                }
            }
        };

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        match response.text().await {
            Ok(body) => classify_response(status, retry_after, &body),
            Err(err) => PageOutcome::Transient {
                message: format!("failed to read response body: {err}"),
            },
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        backoff_delay(attempt, self.config.backoff_base, self.config.backoff_cap)
    }
}

/// Exponential backoff: base doubles per attempt, capped.
fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        let cap = Duration::from_secs(30);
        assert_eq!(backoff_delay(1, base, cap), Duration::from_millis(500));
        assert_eq!(backoff_delay(2, base, cap), Duration::from_secs(1));
        assert_eq!(backoff_delay(3, base, cap), Duration::from_secs(2));
        assert_eq!(backoff_delay(10, base, cap), cap);
        assert_eq!(backoff_delay(u32::MAX, base, cap), cap);
    }

    #[test]
    fn search_url_targets_oracle_tag_search() {
        let client = ScryfallClient::new(ClientConfig {
            base_url: "https://api.example.com/".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.search_url("removal"),
            "https://api.example.com/cards/search?q=otag:removal"
        );
    }
}
