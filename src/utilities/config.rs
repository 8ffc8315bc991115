//! Environment-sourced configuration.
//!
//! `AppConfig::load()` reads an optional `.env` file (never overriding
//! variables already set) and then the process environment. Parsing goes
//! through a lookup closure so tests can feed a plain map.

use std::collections::HashMap;
use std::path::PathBuf;

/// Default Ollama model when `OLLAMA_MODEL` is unset.
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:3b-instruct";
/// Default Ollama host.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
/// Default configured post length.
pub const DEFAULT_MAX_LENGTH: i64 = 220;
/// Default quote cooldown.
pub const DEFAULT_COOLDOWN_DAYS: i64 = 14;
/// Single posts between two threads.
pub const DEFAULT_THREAD_EVERY: u32 = 15;

/// Social platform user-context credentials.
#[derive(Debug, Clone, Default)]
pub struct TwitterCredentials {
    pub api_key: Option<String>,
    pub api_key_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
    pub bearer_token: Option<String>,
}

impl TwitterCredentials {
    /// Names of the four required variables that are not set.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push("TWITTER_API_KEY");
        }
        if self.api_key_secret.is_none() {
            missing.push("TWITTER_API_KEY_SECRET");
        }
        if self.access_token.is_none() {
            missing.push("TWITTER_ACCESS_TOKEN");
        }
        if self.access_token_secret.is_none() {
            missing.push("TWITTER_ACCESS_TOKEN_SECRET");
        }
        missing
    }
}

/// Full bot configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // ── Social platform
    pub twitter: TwitterCredentials,
    pub twitter_wait_on_rate_limit: bool,

    // ── Hosted provider (OpenAI-compatible)
    pub provider_api_key: Option<String>,
    pub provider_base_url: Option<String>,
    pub provider_model: Option<String>,

    // ── Local models
    pub ollama_host: String,
    pub ollama_model: String,
    pub hf_model: Option<String>,
    pub hf_api_token: Option<String>,
    pub hf_endpoint: Option<String>,

    // ── Content
    pub max_length: i64,
    pub fact_subject: String,

    // ── Behavior
    pub dry_run_default: bool,
    pub quote_cooldown_days: i64,
    pub thread_every: u32,

    // ── Stable Horde
    pub horde_api_key: Option<String>,
    pub horde_base_url: Option<String>,
    pub horde_model: Option<String>,
    pub horde_negative_prompt: Option<String>,

    // ── ComfyUI
    pub comfy_base_url: Option<String>,
    pub comfy_checkpoint: Option<String>,
    pub comfy_timeout_s: u64,

    // ── Persistence
    pub quotes_store_path: PathBuf,
    pub state_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_bool(raw: Option<String>, default: bool) -> bool {
    match raw {
        None => default,
        Some(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) => match v.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                log::warn!("Ignoring unparsable {}={:?}; using default", key, v);
                default
            }
        },
    }
}

impl AppConfig {
    /// Load `.env` (if any) and build the configuration from the environment.
    pub fn load() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Failed to read .env: {}", e);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an explicit key/value map.
    pub fn from_map(vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Build from a lookup function. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            twitter: TwitterCredentials {
                api_key: get("TWITTER_API_KEY"),
                api_key_secret: get("TWITTER_API_KEY_SECRET"),
                access_token: get("TWITTER_ACCESS_TOKEN"),
                access_token_secret: get("TWITTER_ACCESS_TOKEN_SECRET"),
                bearer_token: get("TWITTER_BEARER_TOKEN"),
            },
            twitter_wait_on_rate_limit: parse_bool(get("TWITTER_WAIT_ON_RATE_LIMIT"), false),
            provider_api_key: get("PROVIDER_API_KEY"),
            provider_base_url: get("PROVIDER_BASE_URL"),
            provider_model: get("PROVIDER_MODEL"),
            ollama_host: get("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            ollama_model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            hf_model: get("HF_MODEL"),
            hf_api_token: get("HF_API_TOKEN"),
            hf_endpoint: get("HF_ENDPOINT"),
            max_length: parse_number("MAX_LENGTH", get("MAX_LENGTH"), DEFAULT_MAX_LENGTH),
            fact_subject: get("FACT_SUBJECT").unwrap_or_else(|| "stoicism".to_string()),
            dry_run_default: parse_bool(get("DRY_RUN_DEFAULT"), true),
            quote_cooldown_days: parse_number(
                "QUOTE_COOLDOWN_DAYS",
                get("QUOTE_COOLDOWN_DAYS"),
                DEFAULT_COOLDOWN_DAYS,
            ),
            thread_every: parse_number("THREAD_EVERY", get("THREAD_EVERY"), DEFAULT_THREAD_EVERY),
            horde_api_key: get("HORDE_API_KEY"),
            horde_base_url: get("HORDE_BASE_URL"),
            horde_model: get("HORDE_MODEL"),
            horde_negative_prompt: get("HORDE_NEGATIVE_PROMPT"),
            comfy_base_url: get("COMFY_BASE_URL"),
            comfy_checkpoint: get("COMFY_CHECKPOINT"),
            comfy_timeout_s: parse_number("COMFY_TIMEOUT_S", get("COMFY_TIMEOUT_S"), 60),
            quotes_store_path: PathBuf::from(
                get("QUOTES_STORE_PATH").unwrap_or_else(|| "quotes_master.json".to_string()),
            ),
            state_dir: PathBuf::from(
                get("BOT_STATE_DIR").unwrap_or_else(|| ".bot_state".to_string()),
            ),
        }
    }

    /// Whether the hosted provider has everything it needs.
    pub fn provider_configured(&self) -> bool {
        self.provider_api_key.is_some()
            && self.provider_base_url.is_some()
            && self.provider_model.is_some()
    }

    /// Location of the recent-posts blob.
    pub fn recent_posts_path(&self) -> PathBuf {
        self.state_dir.join("recent_posts.json")
    }

    /// Location of the cadence counter blob.
    pub fn cadence_path(&self) -> PathBuf {
        self.state_dir.join("cadence.json")
    }
}
