//! Error types for the bot.
//!
//! Every collaborator (HTTP engines, the posting client, the image backends,
//! the on-disk stores) reports failures through [`BotError`]. Orchestration
//! code never lets one of these terminate a run: it either falls through to
//! the next option or turns the error into a visible skip.

use thiserror::Error;

/// Errors raised by bot components.
#[derive(Debug, Error)]
pub enum BotError {
    /// A required setting is missing or unusable.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered with a non-success status.
    #[error("{service} returned HTTP {status}: {body}")]
    Api {
        service: String,
        status: u16,
        body: String,
    },

    /// The remote API rate-limited the call.
    #[error("{service} rate limit hit (reset at {reset_at:?})")]
    RateLimited {
        service: String,
        reset_at: Option<i64>,
    },

    /// A response arrived but could not be interpreted.
    #[error("Malformed response from {service}: {message}")]
    Malformed { service: String, message: String },

    /// Empty generation or empty post text.
    #[error("Empty content: {0}")]
    EmptyContent(String),

    /// Image decoding or encoding failure.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// A record handed back to the quote store is not in it.
    #[error("Unknown quote: {0}")]
    UnknownQuote(String),

    /// Could not acquire or release a state file lock.
    #[error("State lock error on {path}: {message}")]
    Lock { path: String, message: String },
}

impl BotError {
    /// Build a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Build a malformed-response error.
    pub fn malformed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Network failures, timeouts, 5xx and 429 are transient; every other
    /// API status, malformed bodies and local failures are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Api { status, .. } => *status >= 500,
            Self::RateLimited { .. } => true,
            Self::EmptyContent(_) => true,
            _ => false,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BotError>;
