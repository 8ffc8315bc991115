//! HTTP helpers shared by the engine backends.
//!
//! Status classification lives here so every backend maps 429, 5xx and
//! other 4xx responses onto the same [`BotError`] variants.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::utilities::errors::{BotError, Result};

#[cfg(test)]
pub(crate) mod stub;

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Build a client with a per-call timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Exponential backoff: `base * 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16))
}

/// Epoch seconds from an `x-rate-limit-reset` header, if present.
pub fn rate_limit_reset(headers: &HeaderMap) -> Option<i64> {
    headers
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Cut a response body down for logging.
pub fn clip_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

/// Check the status of `response` and decode its JSON body.
pub async fn read_json(service: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let reset_at = rate_limit_reset(response.headers());
    let body = response.text().await?;

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(BotError::RateLimited {
            service: service.to_string(),
            reset_at,
        });
    }
    if !status.is_success() {
        return Err(BotError::Api {
            service: service.to_string(),
            status: status.as_u16(),
            body: clip_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        BotError::malformed(service, format!("{} - Body: {}", e, clip_body(&body)))
    })
}

/// First non-empty string found under any of `keys`.
pub fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}
