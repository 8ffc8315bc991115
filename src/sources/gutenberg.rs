//! Random paragraph from Project Gutenberg's plain-text Meditations.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;

use super::QuoteSource;
use crate::llms::providers::utils::http_client;
use crate::quotes::QuoteCandidate;
use crate::utilities::errors::{BotError, Result};
use crate::utilities::string_utils::{collapse_whitespace, shorten};

const SERVICE: &str = "gutenberg";
const MIN_WORDS: usize = 9;
const MAX_CHARS: usize = 260;

pub const BOOK_URLS: &[&str] = &[
    // Marcus Aurelius, Meditations
    "https://www.gutenberg.org/cache/epub/2680/pg2680.txt",
];

#[derive(Debug, Clone)]
pub struct GutenbergSource {
    pub urls: Vec<String>,
    pub timeout: Duration,
}

impl Default for GutenbergSource {
    fn default() -> Self {
        Self {
            urls: BOOK_URLS.iter().map(|u| u.to_string()).collect(),
            timeout: Duration::from_secs(20),
        }
    }
}

/// Blank-line separated paragraphs with more than eight words.
pub fn paragraphs(book: &str) -> Vec<&str> {
    let book = book.trim_start_matches('\u{feff}');
    book.split("\n\n")
        .flat_map(|p| p.split("\r\n\r\n"))
        .map(str::trim)
        .filter(|p| p.split_whitespace().count() >= MIN_WORDS)
        .collect()
}

/// Collapse whitespace and shorten to the post length.
pub fn excerpt(paragraph: &str) -> String {
    shorten(&collapse_whitespace(paragraph), MAX_CHARS, "\u{2026}")
}

#[async_trait]
impl QuoteSource for GutenbergSource {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn try_fetch(&self) -> Result<Option<QuoteCandidate>> {
        let Some(url) = self.urls.choose(&mut rand::rng()).cloned() else {
            return Err(BotError::config("no Gutenberg URLs configured"));
        };
        let client = http_client(self.timeout)?;
        let response = client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Api {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body: String::new(),
            });
        }
        let book = response.text().await?;
        let picked = paragraphs(&book).choose(&mut rand::rng()).map(|p| excerpt(p));
        Ok(picked.map(|text| QuoteCandidate::with_author(text, Some("Marcus Aurelius".into()))))
    }
}
