//! Local Ollama engine.
//!
//! Uses the non-streaming chat endpoint and, if that fails for any reason,
//! the older completion endpoint with a plain transcript prompt.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llms::engine::{EngineKind, EngineOutcome, EngineRequest, TextEngine};
use crate::llms::providers::utils::{http_client, read_json};
use crate::utilities::config::AppConfig;
use crate::utilities::errors::{BotError, Result};
use crate::utilities::prompts;

const SERVICE: &str = "ollama";

#[derive(Debug, Clone)]
pub struct OllamaEngine {
    pub host: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f64,
}

impl OllamaEngine {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            model: model.into(),
            timeout: Duration::from_secs(60),
            temperature: 0.7,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.ollama_host.clone(), config.ollama_model.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), path)
    }

    pub fn chat_body(&self, request: &EngineRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": request.max_tokens,
            },
        })
    }

    pub fn generate_body(&self, request: &EngineRequest) -> Value {
        json!({
            "model": self.model,
            "prompt": prompts::transcript(&request.system, &request.prompt),
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": request.max_tokens,
            },
        })
    }

    /// `message.content` from `/api/chat`, or `response` from `/api/generate`.
    pub fn parse_response(response: &Value) -> Option<String> {
        let text = response
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .or_else(|| response.get("response").and_then(Value::as_str))?
            .trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    async fn post(&self, client: &reqwest::Client, path: &str, body: &Value) -> Result<String> {
        let response = client.post(self.url(path)).json(body).send().await?;
        let json = read_json(SERVICE, response).await?;
        Self::parse_response(&json)
            .ok_or_else(|| BotError::EmptyContent(format!("ollama {} returned no text", path)))
    }
}

#[async_trait]
impl TextEngine for OllamaEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Ollama
    }

    fn is_configured(&self) -> bool {
        !self.host.trim().is_empty() && !self.model.trim().is_empty()
    }

    async fn generate(&self, request: &EngineRequest) -> EngineOutcome {
        if !self.is_configured() {
            return EngineOutcome::Unavailable("ollama host or model not set".to_string());
        }
        let client = match http_client(self.timeout) {
            Ok(c) => c,
            Err(e) => return EngineOutcome::Failed(e.to_string()),
        };

        match self.post(&client, "/api/chat", &self.chat_body(request)).await {
            Ok(text) => return EngineOutcome::Text(text),
            Err(e) => log::debug!("Ollama chat failed, trying /api/generate: {}", e),
        }

        match self
            .post(&client, "/api/generate", &self.generate_body(request))
            .await
        {
            Ok(text) => EngineOutcome::Text(text),
            Err(e) => {
                log::warn!("Ollama generation failed: {}", e);
                EngineOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llms::engine::GenerationMode;

    #[test]
    fn test_bodies() {
        let engine = OllamaEngine::new("http://localhost:11434/", "qwen");
        let req = EngineRequest::new("hello", GenerationMode::Tweet, 120);
        let chat = engine.chat_body(&req);
        assert_eq!(chat["stream"], false);
        assert_eq!(chat["messages"][1]["content"], "hello");
        assert_eq!(chat["options"]["num_predict"], 120);

        let gen = engine.generate_body(&req);
        let prompt = gen["prompt"].as_str().unwrap();
        assert!(prompt.ends_with("User: hello\nAssistant:"));
        assert_eq!(engine.url("/api/chat"), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_parse_response_both_shapes() {
        let chat = json!({"message": {"role": "assistant", "content": " Hi "}});
        assert_eq!(OllamaEngine::parse_response(&chat).as_deref(), Some("Hi"));
        let gen = json!({"response": "Done", "done": true});
        assert_eq!(OllamaEngine::parse_response(&gen).as_deref(), Some("Done"));
        assert_eq!(OllamaEngine::parse_response(&json!({"response": ""})), None);
    }

    #[tokio::test]
    async fn test_unreachable_host_fails() {
        let engine = OllamaEngine::new("http://127.0.0.1:9", "qwen");
        let req = EngineRequest::new("x", GenerationMode::Fact, 100);
        assert!(matches!(engine.generate(&req).await, EngineOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_blank_model_unavailable() {
        let engine = OllamaEngine::new("http://127.0.0.1:9", " ");
        let req = EngineRequest::new("x", GenerationMode::Fact, 100);
        assert!(matches!(engine.generate(&req).await, EngineOutcome::Unavailable(_)));
    }
}
