//! ZenQuotes random quote.

use async_trait::async_trait;
use serde_json::Value;

use super::{QuoteSource, DEFAULT_TIMEOUT};
use crate::llms::providers::utils::{first_str, http_client, read_json};
use crate::quotes::QuoteCandidate;
use crate::utilities::errors::Result;

const SERVICE: &str = "zenquotes";

#[derive(Debug, Clone)]
pub struct ZenQuotesSource {
    pub url: String,
}

impl Default for ZenQuotesSource {
    fn default() -> Self {
        Self {
            url: "https://zenquotes.io/api/random".to_string(),
        }
    }
}

/// `[{"q": text, "a": author}]`
pub fn parse_zenquotes(body: &Value) -> Option<QuoteCandidate> {
    let item = body.as_array()?.first()?;
    let text = first_str(item, &["q"])?;
    let author = first_str(item, &["a"]).map(str::to_string);
    Some(QuoteCandidate::with_author(text, author))
}

#[async_trait]
impl QuoteSource for ZenQuotesSource {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn try_fetch(&self) -> Result<Option<QuoteCandidate>> {
        let client = http_client(DEFAULT_TIMEOUT)?;
        let body = read_json(SERVICE, client.get(&self.url).send().await?).await?;
        Ok(parse_zenquotes(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse() {
        let body = json!([{"q": " Act well your part. ", "a": "Epictetus", "h": "<b>"}]);
        let c = parse_zenquotes(&body).unwrap();
        assert_eq!(c.text, "Act well your part.");
        assert_eq!(c.author.as_deref(), Some("Epictetus"));

        assert!(parse_zenquotes(&json!([])).is_none());
        assert!(parse_zenquotes(&json!({"q": "x"})).is_none());
        assert!(parse_zenquotes(&json!([{"q": ""}])).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_is_none() {
        let source = ZenQuotesSource {
            url: "http://127.0.0.1:9/api/random".into(),
        };
        assert!(source.fetch().await.is_none());
    }
}
