//! Ordered fallback across text engines.
//!
//! `auto` tries provider, then Ollama, then the small model, then the
//! canned fallback; the first non-empty normalized output wins. An explicit
//! selection tries only that engine and falls back to the canned engine if
//! it produces nothing. Every result is truncated to the effective limit.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::llms::engine::{
    EngineKind, EngineOutcome, EngineRequest, EngineSelection, GenerationMode, TextEngine,
};
use crate::llms::fallback::FallbackEngine;
use crate::llms::normalize::normalize_output;
use crate::llms::providers::huggingface::HuggingFaceEngine;
use crate::llms::providers::ollama::OllamaEngine;
use crate::llms::providers::openai::ProviderEngine;
use crate::utilities::config::AppConfig;
use crate::utilities::string_utils::truncate_chars;

/// Final text plus the engine that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub engine: EngineKind,
}

/// The generation fallback chain.
#[derive(Debug, Clone)]
pub struct GenerationChain {
    engines: Vec<Arc<dyn TextEngine>>,
    fallback: Arc<dyn TextEngine>,
    max_length: i64,
}

impl GenerationChain {
    /// Chain over explicit engines, tried in the given order in auto mode.
    pub fn new(engines: Vec<Arc<dyn TextEngine>>, max_length: i64) -> Self {
        Self {
            engines,
            fallback: Arc::new(FallbackEngine),
            max_length,
        }
    }

    /// Replace the canned engine used as the last resort.
    pub fn with_fallback(mut self, fallback: Arc<dyn TextEngine>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Build every engine once from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let engines: Vec<Arc<dyn TextEngine>> = vec![
            Arc::new(ProviderEngine::from_config(config)),
            Arc::new(OllamaEngine::from_config(config)),
            Arc::new(HuggingFaceEngine::from_config(config)),
        ];
        Self::new(engines, config.max_length)
    }

    pub fn max_length(&self) -> i64 {
        self.max_length
    }

    /// Copy of this chain with a different length limit.
    pub fn with_max_length(&self, max_length: i64) -> Self {
        Self {
            max_length,
            ..self.clone()
        }
    }

    fn engine(&self, kind: EngineKind) -> Option<&Arc<dyn TextEngine>> {
        self.engines.iter().find(|e| e.kind() == kind)
    }

    /// Kinds with the configuration they need, in auto order.
    pub fn configured(&self) -> Vec<EngineKind> {
        self.engines
            .iter()
            .chain(std::iter::once(&self.fallback))
            .filter(|e| e.is_configured())
            .map(|e| e.kind())
            .collect()
    }

    async fn attempt(&self, engine: &dyn TextEngine, request: &EngineRequest) -> Option<String> {
        match engine.generate(request).await {
            EngineOutcome::Text(raw) => {
                let text = normalize_output(&raw, &request.prompt, request.mode);
                let text = truncate_chars(&text, self.max_length);
                if text.trim().is_empty() {
                    log::debug!("{} produced only noise after cleanup", engine.kind());
                    None
                } else {
                    Some(text)
                }
            }
            EngineOutcome::Unavailable(reason) => {
                log::debug!("{} unavailable: {}", engine.kind(), reason);
                None
            }
            EngineOutcome::Failed(reason) => {
                log::warn!("{} failed: {}", engine.kind(), reason);
                None
            }
        }
    }

    /// Produce post text for `prompt`.
    pub async fn generate(
        &self,
        prompt: &str,
        selection: EngineSelection,
        mode: GenerationMode,
    ) -> Generation {
        let request = EngineRequest::new(prompt, mode, self.max_length);

        let candidates: Vec<&Arc<dyn TextEngine>> = match selection.only() {
            Some(EngineKind::Fallback) => vec![],
            Some(kind) => self.engine(kind).into_iter().collect(),
            None => self.engines.iter().collect(),
        };

        for engine in candidates {
            if let Some(text) = self.attempt(engine.as_ref(), &request).await {
                log::info!("Generated {} chars with {}", text.chars().count(), engine.kind());
                return Generation {
                    text,
                    engine: engine.kind(),
                };
            }
        }

        if let Some(text) = self.attempt(self.fallback.as_ref(), &request).await {
            return Generation {
                text,
                engine: EngineKind::Fallback,
            };
        }

        // The canned engine came back empty too: echo the prompt.
        let seed = if prompt.trim().is_empty() { "..." } else { prompt.trim() };
        Generation {
            text: truncate_chars(seed, self.max_length),
            engine: EngineKind::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    #[derive(Debug)]
    struct StubEngine {
        kind: EngineKind,
        outcome: EngineOutcome,
        calls: AtomicUsize,
    }

    impl StubEngine {
        fn new(kind: EngineKind, outcome: EngineOutcome) -> Arc<Self> {
            Arc::new(Self {
                kind,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextEngine for StubEngine {
        fn kind(&self) -> EngineKind {
            self.kind
        }

        fn is_configured(&self) -> bool {
            !matches!(self.outcome, EngineOutcome::Unavailable(_))
        }

        async fn generate(&self, _request: &EngineRequest) -> EngineOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn text(s: &str) -> EngineOutcome {
        EngineOutcome::Text(s.to_string())
    }

    fn failed() -> EngineOutcome {
        EngineOutcome::Failed("boom".to_string())
    }

    #[tokio::test]
    async fn test_auto_first_success_wins() {
        let provider = StubEngine::new(EngineKind::Provider, failed());
        let ollama = StubEngine::new(EngineKind::Ollama, text("From ollama."));
        let hf = StubEngine::new(EngineKind::Hf, text("From hf."));
        let engines: Vec<Arc<dyn TextEngine>> = vec![provider.clone(), ollama.clone(), hf.clone()];
        let chain = GenerationChain::new(engines, 220);

        let out = chain
            .generate("prompt", EngineSelection::Auto, GenerationMode::Tweet)
            .await;
        assert_eq!(out.text, "From ollama.");
        assert_eq!(out.engine, EngineKind::Ollama);
        assert_eq!(provider.calls(), 1);
        assert_eq!(hf.calls(), 0);
    }

    #[tokio::test]
    async fn test_auto_never_empty_when_everything_fails() {
        let engines: Vec<Arc<dyn TextEngine>> = vec![
            StubEngine::new(EngineKind::Provider, EngineOutcome::Unavailable("no key".into())),
            StubEngine::new(EngineKind::Ollama, failed()),
            StubEngine::new(EngineKind::Hf, text("   ")),
        ];
        let chain = GenerationChain::new(engines, 220);
        let out = chain
            .generate("stoic discipline", EngineSelection::Auto, GenerationMode::Tweet)
            .await;
        assert!(!out.text.is_empty());
        assert_eq!(out.engine, EngineKind::Fallback);
    }

    #[tokio::test]
    async fn test_auto_survives_empty_fallback() {
        let chain = GenerationChain::new(vec![], 220)
            .with_fallback(StubEngine::new(EngineKind::Fallback, text("\"\"")));
        let out = chain
            .generate("keep going", EngineSelection::Auto, GenerationMode::Tweet)
            .await;
        assert_eq!(out.text, "keep going");
    }

    #[tokio::test]
    async fn test_explicit_selection_falls_to_fallback_only() {
        let provider = StubEngine::new(EngineKind::Provider, text("provider text"));
        let ollama = StubEngine::new(EngineKind::Ollama, failed());
        let fallback = StubEngine::new(EngineKind::Fallback, text("canned"));
        let engines: Vec<Arc<dyn TextEngine>> = vec![provider.clone(), ollama.clone()];
        let chain = GenerationChain::new(engines, 220).with_fallback(fallback.clone());

        let out = chain
            .generate("p", EngineSelection::Ollama, GenerationMode::Tweet)
            .await;
        assert_eq!(out.text, "canned");
        assert_eq!(out.engine, EngineKind::Fallback);
        assert_eq!(provider.calls(), 0);
        assert_eq!(ollama.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_truncation_limits() {
        let engines = || -> Vec<Arc<dyn TextEngine>> {
            vec![StubEngine::new(EngineKind::Provider, EngineOutcome::Text("x".repeat(400)))]
        };

        let big = GenerationChain::new(engines(), 10_000);
        let out = big.generate("p", EngineSelection::Auto, GenerationMode::Tweet).await;
        assert_eq!(out.text.chars().count(), 275);

        let zero = GenerationChain::new(engines(), 0);
        let out = zero.generate("p", EngineSelection::Auto, GenerationMode::Tweet).await;
        assert_eq!(out.text, "x");

        let negative = GenerationChain::new(engines(), -5);
        let out = negative.generate("p", EngineSelection::Provider, GenerationMode::Tweet).await;
        assert_eq!(out.text.chars().count(), 1);
    }

    #[tokio::test]
    async fn test_fact_mode_normalizes() {
        let engines: Vec<Arc<dyn TextEngine>> =
            vec![StubEngine::new(EngineKind::Provider, text("\"sharks predate trees\""))];
        let chain = GenerationChain::new(engines, 220);
        let out = chain
            .generate("fact please", EngineSelection::Auto, GenerationMode::Fact)
            .await;
        assert_eq!(out.text, "Fun fact: sharks predate trees.");
    }

    #[test]
    fn test_from_config_reports_configured_engines() {
        let chain = GenerationChain::from_config(&AppConfig::default());
        let configured = chain.configured();
        assert!(!configured.contains(&EngineKind::Provider));
        assert!(configured.contains(&EngineKind::Ollama));
        assert!(!configured.contains(&EngineKind::Hf));
        assert!(configured.contains(&EngineKind::Fallback));
        assert_eq!(chain.max_length(), 220);
    }
}
