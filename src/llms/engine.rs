//! Text engine abstraction.
//!
//! Every generation backend (hosted provider, local model service, small
//! model endpoint, canned fallback) implements [`TextEngine`] and reports an
//! explicit [`EngineOutcome`] instead of raising: the chain composes these
//! outcomes into an ordered fallback.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utilities::prompts;

// ---------------------------------------------------------------------------
// Engine identity and selection
// ---------------------------------------------------------------------------

/// Concrete engine identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Hosted OpenAI-compatible provider.
    Provider,
    /// Locally addressed Ollama service.
    Ollama,
    /// Small Hugging Face text-generation model.
    Hf,
    /// Canned lines, no I/O.
    Fallback,
}

impl EngineKind {
    /// Order tried in `auto` mode.
    pub const AUTO_ORDER: [EngineKind; 4] = [
        EngineKind::Provider,
        EngineKind::Ollama,
        EngineKind::Hf,
        EngineKind::Fallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Ollama => "ollama",
            Self::Hf => "hf",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine choice requested by the caller.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum EngineSelection {
    #[default]
    Auto,
    Provider,
    Ollama,
    Hf,
    Fallback,
}

impl EngineSelection {
    /// The single engine to try, or `None` for auto.
    pub fn only(&self) -> Option<EngineKind> {
        match self {
            Self::Auto => None,
            Self::Provider => Some(EngineKind::Provider),
            Self::Ollama => Some(EngineKind::Ollama),
            Self::Hf => Some(EngineKind::Hf),
            Self::Fallback => Some(EngineKind::Fallback),
        }
    }
}

impl FromStr for EngineSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "provider" => Ok(Self::Provider),
            "ollama" => Ok(Self::Ollama),
            "hf" => Ok(Self::Hf),
            "fallback" => Ok(Self::Fallback),
            other => Err(format!(
                "engine must be one of: auto, provider, ollama, hf, fallback (got '{}')",
                other
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

/// What kind of text is being produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMode {
    /// Free-form post copy.
    #[default]
    Tweet,
    /// One narrative fact with a required leading phrase.
    Fact,
}

impl GenerationMode {
    pub fn system_prompt(&self) -> String {
        match self {
            Self::Tweet => prompts::tweet_system_prompt().to_string(),
            Self::Fact => prompts::fact_system_prompt(),
        }
    }
}

/// One generation call as seen by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    pub system: String,
    pub prompt: String,
    pub mode: GenerationMode,
    /// Token budget derived from the configured length.
    pub max_tokens: u32,
}

impl EngineRequest {
    pub fn new(prompt: impl Into<String>, mode: GenerationMode, max_length: i64) -> Self {
        Self {
            system: mode.system_prompt(),
            prompt: prompt.into(),
            mode,
            max_tokens: max_length.clamp(60, 200) as u32,
        }
    }
}

/// Result of one engine attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// Usable, non-empty text.
    Text(String),
    /// Not configured or not reachable by construction; never tried.
    Unavailable(String),
    /// Tried and failed (after any retries).
    Failed(String),
}

impl EngineOutcome {
    /// Wrap raw engine output, mapping blank text to `Failed`.
    pub fn from_raw(raw: Option<String>) -> Self {
        match raw.map(|t| t.trim().to_string()) {
            Some(text) if !text.is_empty() => Self::Text(text),
            _ => Self::Failed("empty content".to_string()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TextEngine trait
// ---------------------------------------------------------------------------

/// A pluggable generation backend.
///
/// Implementations catch their own transport and API errors and report them
/// as `Failed`; nothing is raised to the chain.
#[async_trait]
pub trait TextEngine: Send + Sync + fmt::Debug {
    fn kind(&self) -> EngineKind;

    /// Whether the engine has the configuration it needs.
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, request: &EngineRequest) -> EngineOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_parse() {
        assert_eq!("AUTO".parse::<EngineSelection>().unwrap(), EngineSelection::Auto);
        assert_eq!(" hf ".parse::<EngineSelection>().unwrap(), EngineSelection::Hf);
        assert!("gpt".parse::<EngineSelection>().is_err());
        assert_eq!(EngineSelection::Ollama.only(), Some(EngineKind::Ollama));
        assert_eq!(EngineSelection::Auto.only(), None);
    }

    #[test]
    fn test_request_token_budget() {
        assert_eq!(EngineRequest::new("p", GenerationMode::Tweet, 0).max_tokens, 60);
        assert_eq!(EngineRequest::new("p", GenerationMode::Tweet, 150).max_tokens, 150);
        assert_eq!(EngineRequest::new("p", GenerationMode::Fact, 5000).max_tokens, 200);
    }

    #[test]
    fn test_outcome_from_raw() {
        assert_eq!(
            EngineOutcome::from_raw(Some("  hi ".into())),
            EngineOutcome::Text("hi".into())
        );
        assert!(matches!(EngineOutcome::from_raw(Some("   ".into())), EngineOutcome::Failed(_)));
        assert!(matches!(EngineOutcome::from_raw(None), EngineOutcome::Failed(_)));
    }

    #[test]
    fn test_auto_order() {
        assert_eq!(EngineKind::AUTO_ORDER[0], EngineKind::Provider);
        assert_eq!(EngineKind::AUTO_ORDER[3], EngineKind::Fallback);
    }
}
