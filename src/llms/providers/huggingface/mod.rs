//! Small text-generation model served through the Hugging Face inference API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llms::engine::{EngineKind, EngineOutcome, EngineRequest, TextEngine};
use crate::llms::providers::utils::{http_client, read_json};
use crate::utilities::config::AppConfig;
use crate::utilities::errors::{BotError, Result};
use crate::utilities::prompts;

const SERVICE: &str = "huggingface";
const INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models";

#[derive(Debug, Clone)]
pub struct HuggingFaceEngine {
    pub model: Option<String>,
    pub api_token: Option<String>,
    /// Full URL overriding the public inference endpoint.
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl HuggingFaceEngine {
    pub fn new(model: Option<String>, api_token: Option<String>, endpoint: Option<String>) -> Self {
        Self {
            model,
            api_token,
            endpoint,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.hf_model.clone(),
            config.hf_api_token.clone(),
            config.hf_endpoint.clone(),
        )
    }

    pub fn url(&self) -> Option<String> {
        if let Some(endpoint) = &self.endpoint {
            return Some(endpoint.clone());
        }
        self.model
            .as_deref()
            .map(|m| format!("{}/{}", INFERENCE_BASE, m.trim_matches('/')))
    }

    pub fn request_body(&self, request: &EngineRequest) -> Value {
        json!({
            "inputs": prompts::transcript(&request.system, &request.prompt),
            "parameters": {
                "max_new_tokens": request.max_tokens,
                "temperature": 0.7,
                "top_p": 0.95,
                "do_sample": true,
                "return_full_text": false,
            },
            "options": {"wait_for_model": true},
        })
    }

    /// `[{"generated_text": ...}]` or a bare object with the same key.
    pub fn parse_response(response: &Value) -> Option<String> {
        let item = match response {
            Value::Array(items) => items.first()?,
            other => other,
        };
        let text = item.get("generated_text")?.as_str()?.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    async fn call(&self, url: &str, request: &EngineRequest) -> Result<String> {
        let client = http_client(self.timeout)?;
        let mut builder = client.post(url).json(&self.request_body(request));
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }
        let json = read_json(SERVICE, builder.send().await?).await?;
        if let Some(err) = json.get("error").and_then(Value::as_str) {
            return Err(BotError::malformed(SERVICE, err));
        }
        Self::parse_response(&json)
            .ok_or_else(|| BotError::EmptyContent("huggingface returned no text".to_string()))
    }
}

#[async_trait]
impl TextEngine for HuggingFaceEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Hf
    }

    fn is_configured(&self) -> bool {
        self.url().is_some()
    }

    async fn generate(&self, request: &EngineRequest) -> EngineOutcome {
        let Some(url) = self.url() else {
            return EngineOutcome::Unavailable("HF_MODEL not set".to_string());
        };
        match self.call(&url, request).await {
            Ok(text) => EngineOutcome::Text(text),
            Err(e) => {
                log::warn!("Hugging Face generation failed: {}", e);
                EngineOutcome::Failed(e.to_string())
            }
        }
    }
}
