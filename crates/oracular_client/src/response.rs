//! Response decoding and classification.
//!
//! The remote payload is decoded into a tagged outcome here, at the client
//! boundary, so nothing downstream ever handles untyped response data.

use std::time::Duration;

use serde::Deserialize;

use oracular_protocol::CardPayload;

/// One page of a tag search.
#[derive(Debug, Deserialize)]
pub struct TagPage {
    pub data: Vec<CardPayload>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub total_cards: Option<u64>,
}

/// Error body the API attaches to non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// What a single page request produced, before retry policy is applied.
#[derive(Debug)]
pub(crate) enum PageOutcome {
    Page(TagPage),
    /// 404 on a search means the query matched zero cards, not a failure.
    NoMatches,
    RateLimited {
        retry_after: Option<Duration>,
    },
    Transient {
        message: String,
    },
    Permanent {
        message: String,
    },
}

pub(crate) fn classify_response(
    status: u16,
    retry_after_secs: Option<u64>,
    body: &str,
) -> PageOutcome {
    match status {
        200..=299 => match serde_json::from_str::<TagPage>(body) {
            Ok(page) => PageOutcome::Page(page),
            Err(err) => PageOutcome::Transient {
                message: format!("malformed response body: {err}"),
            },
        },
        404 => PageOutcome::NoMatches,
        429 => PageOutcome::RateLimited {
            retry_after: retry_after_secs.map(Duration::from_secs),
        },
        400..=499 => PageOutcome::Permanent {
            message: error_message(status, body),
        },
        _ => PageOutcome::Transient {
            message: error_message(status, body),
        },
    }
}

fn error_message(status: u16, body: &str) -> String {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    match (parsed.code, parsed.details) {
        (Some(code), Some(details)) => format!("HTTP {status} ({code}): {details}"),
        (_, Some(details)) => format!("HTTP {status}: {details}"),
        _ => format!("HTTP {status}"),
    }
}
