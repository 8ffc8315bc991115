//! Hosted OpenAI-compatible provider engine.
//!
//! Talks to any `POST {base}/chat/completions` endpoint with a bearer key.
//! Transient failures (transport errors, 429, 5xx, empty content) are retried
//! with exponential backoff; other client errors and unparsable bodies fail
//! immediately.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llms::engine::{EngineKind, EngineOutcome, EngineRequest, TextEngine};
use crate::llms::providers::utils::{backoff_delay, http_client, read_json};
use crate::utilities::config::AppConfig;
use crate::utilities::errors::{BotError, Result};

const SERVICE: &str = "provider";

/// Hosted provider engine.
#[derive(Debug, Clone)]
pub struct ProviderEngine {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// Total attempts, first call included.
    pub max_attempts: u32,
    /// Backoff base; attempt `n` waits `base * 2^n`.
    pub backoff_base: Duration,
    pub timeout: Duration,
    pub temperature: f64,
}

impl ProviderEngine {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            api_key,
            base_url,
            model,
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            temperature: 0.7,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.provider_api_key.clone(),
            config.provider_base_url.clone(),
            config.provider_model.clone(),
        )
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Chat completions endpoint, tolerant of a trailing slash on the base.
    pub fn endpoint(&self) -> Option<String> {
        self.base_url
            .as_deref()
            .map(|b| format!("{}/chat/completions", b.trim_end_matches('/')))
    }

    pub fn build_request_body(&self, request: &EngineRequest) -> Value {
        json!({
            "model": self.model.as_deref().unwrap_or_default(),
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "temperature": self.temperature,
            "max_tokens": request.max_tokens,
        })
    }

    /// Text of the first choice, trimmed. `None` when absent or blank.
    pub fn parse_response(response: &Value) -> Option<String> {
        let content = response
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()?
            .trim();
        (!content.is_empty()).then(|| content.to_string())
    }

    async fn call_once(
        &self,
        client: &reqwest::Client,
        endpoint: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<String> {
        let response = client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(body)
            .send()
            .await?;
        let json = read_json(SERVICE, response).await?;

        if let Some(err) = json.get("error") {
            let msg = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown provider error");
            return Err(BotError::malformed(SERVICE, msg));
        }

        Self::parse_response(&json)
            .ok_or_else(|| BotError::EmptyContent("provider returned no content".to_string()))
    }
}

#[async_trait]
impl TextEngine for ProviderEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Provider
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.base_url.is_some() && self.model.is_some()
    }

    async fn generate(&self, request: &EngineRequest) -> EngineOutcome {
        let (Some(api_key), Some(endpoint)) = (self.api_key.as_deref(), self.endpoint()) else {
            return EngineOutcome::Unavailable("provider not configured".to_string());
        };
        if self.model.is_none() {
            return EngineOutcome::Unavailable("provider model not set".to_string());
        }

        let client = match http_client(self.timeout) {
            Ok(c) => c,
            Err(e) => return EngineOutcome::Failed(e.to_string()),
        };
        let body = self.build_request_body(request);

        let attempts = self.max_attempts.max(1);
        let mut last_error = String::from("no attempt made");

        for attempt in 0..attempts {
            match self.call_once(&client, &endpoint, api_key, &body).await {
                Ok(text) => return EngineOutcome::Text(text),
                Err(e) => {
                    last_error = e.to_string();
                    if !e.is_transient() {
                        log::warn!("Provider call failed permanently: {}", e);
                        return EngineOutcome::Failed(last_error);
                    }
                    if attempt + 1 < attempts {
                        let delay = backoff_delay(self.backoff_base, attempt);
                        log::warn!(
                            "Provider attempt {}/{} failed ({}); retrying in {:?}",
                            attempt + 1,
                            attempts,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        log::warn!("Provider gave up after {} attempts: {}", attempts, last_error);
        EngineOutcome::Failed(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llms::engine::GenerationMode;
    use crate::llms::providers::utils::stub::{Reply, StubServer};

    fn completion(content: &str) -> Reply {
        Reply::json(200, json!({"choices": [{"message": {"content": content}}]}))
    }

    async fn generate_against(replies: Vec<Reply>) -> (EngineOutcome, usize) {
        let server = StubServer::start(replies).await;
        let engine = configured(&server.base_url);
        let req = EngineRequest::new("x", GenerationMode::Tweet, 100);
        let outcome = engine.generate(&req).await;
        (outcome, server.hits())
    }

    fn configured(base: &str) -> ProviderEngine {
        ProviderEngine::new(
            Some("sk-test".into()),
            Some(base.into()),
            Some("gpt-test".into()),
        )
        .with_backoff_base(Duration::ZERO)
    }

    #[test]
    fn test_defaults() {
        let engine = ProviderEngine::new(None, None, None);
        assert_eq!(engine.max_attempts, 3);
        assert_eq!(engine.backoff_base, Duration::from_millis(500));
        assert!(!engine.is_configured());
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let engine = configured("https://api.example.com/v1/");
        assert_eq!(
            engine.endpoint().as_deref(),
            Some("https://api.example.com/v1/chat/completions")
        );
    }

    #[test]
    fn test_request_body() {
        let engine = configured("https://api.example.com/v1");
        let req = EngineRequest::new("write something", GenerationMode::Tweet, 220);
        let body = engine.build_request_body(&req);
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "write something");
        assert_eq!(body["max_tokens"], 200);
    }

    #[test]
    fn test_parse_response() {
        let ok = json!({"choices": [{"message": {"content": "  Hello there  "}}]});
        assert_eq!(ProviderEngine::parse_response(&ok).as_deref(), Some("Hello there"));

        let blank = json!({"choices": [{"message": {"content": "   "}}]});
        assert_eq!(ProviderEngine::parse_response(&blank), None);
        assert_eq!(ProviderEngine::parse_response(&json!({"choices": []})), None);
    }

    #[tokio::test]
    async fn test_unconfigured_is_unavailable() {
        let engine = ProviderEngine::new(Some("k".into()), None, Some("m".into()));
        let req = EngineRequest::new("x", GenerationMode::Tweet, 100);
        assert!(matches!(engine.generate(&req).await, EngineOutcome::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_fails_after_retries() {
        let engine = configured("http://127.0.0.1:9/v1");
        let req = EngineRequest::new("x", GenerationMode::Tweet, 100);
        assert!(matches!(engine.generate(&req).await, EngineOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_server_errors_use_exactly_three_attempts() {
        let (outcome, hits) = generate_against(vec![Reply::status(500)]).await;
        assert!(matches!(outcome, EngineOutcome::Failed(_)));
        assert_eq!(hits, 3);
    }

    #[tokio::test]
    async fn test_empty_completion_is_retried() {
        let (outcome, hits) =
            generate_against(vec![completion("   "), completion("Second try.")]).await;
        assert_eq!(outcome, EngineOutcome::Text("Second try.".to_string()));
        assert_eq!(hits, 2);

        let (outcome, hits) = generate_against(vec![completion("")]).await;
        assert!(matches!(outcome, EngineOutcome::Failed(_)));
        assert_eq!(hits, 3);
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let (outcome, hits) = generate_against(vec![
            Reply::status(429),
            Reply::status(503),
            completion("Made it."),
        ])
        .await;
        assert_eq!(outcome, EngineOutcome::Text("Made it.".to_string()));
        assert_eq!(hits, 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (outcome, hits) = generate_against(vec![Reply::status(400), completion("never")]).await;
        assert!(matches!(outcome, EngineOutcome::Failed(_)));
        assert_eq!(hits, 1);
    }
}
