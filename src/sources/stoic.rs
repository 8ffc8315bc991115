//! Stoic quote API.

use async_trait::async_trait;
use serde_json::Value;

use super::{QuoteSource, DEFAULT_TIMEOUT};
use crate::llms::providers::utils::{first_str, http_client, read_json};
use crate::quotes::QuoteCandidate;
use crate::utilities::errors::Result;

const SERVICE: &str = "stoic-api";

#[derive(Debug, Clone)]
pub struct StoicQuoteSource {
    pub url: String,
}

impl Default for StoicQuoteSource {
    fn default() -> Self {
        Self {
            url: "https://stoic-api.vercel.app/api/quote".to_string(),
        }
    }
}

/// Text from `text`, `quote` or `message`; optional `author`.
pub fn parse_stoic(body: &Value) -> Option<QuoteCandidate> {
    if !body.is_object() {
        return None;
    }
    let text = first_str(body, &["text", "quote", "message"])?;
    let author = first_str(body, &["author"]).map(str::to_string);
    Some(QuoteCandidate::with_author(text, author))
}

#[async_trait]
impl QuoteSource for StoicQuoteSource {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn try_fetch(&self) -> Result<Option<QuoteCandidate>> {
        let client = http_client(DEFAULT_TIMEOUT)?;
        let body = read_json(SERVICE, client.get(&self.url).send().await?).await?;
        Ok(parse_stoic(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_variants() {
        let c = parse_stoic(&json!({"text": "Waste no more time.", "author": "Marcus Aurelius"})).unwrap();
        assert_eq!(c.display_text(), "\"Waste no more time.\" - Marcus Aurelius");

        let c = parse_stoic(&json!({"quote": "We suffer more in imagination.", "author": " "})).unwrap();
        assert_eq!(c.author, None);

        let c = parse_stoic(&json!({"message": "Begin at once."})).unwrap();
        assert_eq!(c.text, "Begin at once.");

        assert!(parse_stoic(&json!({"text": "  "})).is_none());
        assert!(parse_stoic(&json!(["x"])).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_is_none() {
        let source = StoicQuoteSource {
            url: "http://127.0.0.1:9/api/quote".into(),
        };
        assert!(source.fetch().await.is_none());
    }
}
