//! First sentence of a Wikipedia page summary.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::seq::IndexedRandom;
use regex::Regex;
use serde_json::Value;

use super::{QuoteSource, DEFAULT_TIMEOUT};
use crate::llms::providers::utils::{http_client, read_json};
use crate::quotes::QuoteCandidate;
use crate::utilities::errors::Result;

const SERVICE: &str = "wikipedia";
const MAX_SENTENCE_CHARS: usize = 240;

pub const PAGES: &[&str] = &[
    "Marcus_Aurelius",
    "Seneca_the_Younger",
    "Epictetus",
    "Stoicism",
    "Chess",
    "Spartan_army",
    "Battle",
];

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct WikiSummarySource {
    pub base_url: String,
}

impl Default for WikiSummarySource {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org/api/rest_v1/page/summary".to_string(),
        }
    }
}

/// First sentence of `extract`, capped at 240 characters.
pub fn first_sentence(extract: &str) -> Option<String> {
    let text = extract.trim();
    if text.is_empty() {
        return None;
    }
    let sentence = match SENTENCE_END.find(text) {
        Some(m) => &text[..m.start() + 1],
        None => text,
    };
    Some(sentence.chars().take(MAX_SENTENCE_CHARS).collect())
}

pub fn parse_summary(body: &Value) -> Option<QuoteCandidate> {
    let extract = body.get("extract")?.as_str()?;
    first_sentence(extract).map(QuoteCandidate::new)
}

#[async_trait]
impl QuoteSource for WikiSummarySource {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn try_fetch(&self) -> Result<Option<QuoteCandidate>> {
        let page = PAGES.choose(&mut rand::rng()).copied().unwrap_or("Stoicism");
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), page);
        let client = http_client(DEFAULT_TIMEOUT)?;
        let body = read_json(SERVICE, client.get(&url).send().await?).await?;
        Ok(parse_summary(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_sentence() {
        assert_eq!(
            first_sentence("Chess is a board game. It is played by two.").as_deref(),
            Some("Chess is a board game.")
        );
        assert_eq!(first_sentence("No terminator").as_deref(), Some("No terminator"));
        assert_eq!(first_sentence("   "), None);
        let long = "a".repeat(500);
        assert_eq!(first_sentence(&long).unwrap().chars().count(), 240);
    }

    #[test]
    fn test_parse_summary() {
        let body = json!({"title": "Epictetus", "extract": "Epictetus was a Greek Stoic philosopher. He was born a slave."});
        assert_eq!(
            parse_summary(&body).unwrap().text,
            "Epictetus was a Greek Stoic philosopher."
        );
        assert!(parse_summary(&json!({"extract": ""})).is_none());
        assert!(parse_summary(&json!({})).is_none());
    }
}
