//! AI-generated backgrounds.
//!
//! Two backends behind [`ImageBackend`]: a local ComfyUI server running an
//! SDXL txt2img graph, and the Stable Horde crowd cluster. Both submit a job
//! and poll at a fixed interval for a bounded number of iterations.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use serde_json::{json, Value};

use crate::llms::providers::utils::{http_client, read_json};
use crate::utilities::config::AppConfig;
use crate::utilities::errors::{BotError, Result};

pub const DEFAULT_HORDE_URL: &str = "https://stablehorde.net/api";
/// Anonymous Horde key.
pub const ANONYMOUS_HORDE_KEY: &str = "0000000000";
pub const DEFAULT_NEGATIVE_PROMPT: &str =
    "text, watermark, signature, letters, logo, blurry, lowres, deformed";

/// A text-to-image backend.
#[async_trait]
pub trait ImageBackend: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    async fn try_generate(&self, prompt: &str) -> Result<Option<Vec<u8>>>;

    /// Generate, logging and swallowing failures.
    async fn generate(&self, prompt: &str) -> Option<Vec<u8>> {
        match self.try_generate(prompt).await {
            Ok(Some(bytes)) if !bytes.is_empty() => Some(bytes),
            Ok(_) => {
                log::warn!("{} produced no image", self.name());
                None
            }
            Err(e) => {
                log::warn!("{} image generation failed: {}", self.name(), e);
                None
            }
        }
    }
}

/// Backends tried in order; first image wins.
#[derive(Debug, Default)]
pub struct BackgroundGenerator {
    backends: Vec<Box<dyn ImageBackend>>,
}

impl BackgroundGenerator {
    pub fn new(backends: Vec<Box<dyn ImageBackend>>) -> Self {
        Self { backends }
    }

    /// ComfyUI when configured, then Stable Horde.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut backends: Vec<Box<dyn ImageBackend>> = Vec::new();
        if let Some(comfy) = ComfyClient::from_config(config) {
            backends.push(Box::new(comfy));
        }
        backends.push(Box::new(HordeClient::from_config(config)));
        Self { backends }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub async fn generate(&self, prompt: &str) -> Option<Vec<u8>> {
        for backend in &self.backends {
            if let Some(bytes) = backend.generate(prompt).await {
                log::info!("Background from {} ({} bytes)", backend.name(), bytes.len());
                return Some(bytes);
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Stable Horde
// ---------------------------------------------------------------------------

/// How a finished Horde generation hands over its image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HordeImage {
    Url(String),
    Base64(String),
}

#[derive(Debug, Clone)]
pub struct HordeClient {
    pub base_url: String,
    pub api_key: String,
    pub model: Option<String>,
    pub negative_prompt: Option<String>,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl HordeClient {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            base_url: config
                .horde_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_HORDE_URL.to_string()),
            api_key: config
                .horde_api_key
                .clone()
                .unwrap_or_else(|| ANONYMOUS_HORDE_KEY.to_string()),
            model: config.horde_model.clone(),
            negative_prompt: config.horde_negative_prompt.clone(),
            width: 768,
            height: 1024,
            steps: 20,
            poll_interval: Duration::from_secs(1),
            max_polls: 60,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Body for `POST /v2/generate/async`. The negative prompt rides after
    /// the `###` separator.
    pub fn submit_body(&self, prompt: &str) -> Value {
        let prompt = match self.negative_prompt.as_deref().map(str::trim) {
            Some(neg) if !neg.is_empty() => format!("{} ### {}", prompt, neg),
            _ => prompt.to_string(),
        };
        let mut body = json!({
            "prompt": prompt,
            "params": {
                "sampler_name": "k_euler_a",
                "width": self.width,
                "height": self.height,
                "steps": self.steps,
                "n": 1,
            },
            "nsfw": false,
            "censor_nsfw": true,
            "r2": true,
        });
        if let Some(model) = &self.model {
            body["models"] = json!([model]);
        }
        body
    }

    /// The first generation of a finished status payload.
    pub fn parse_status(status: &Value) -> Option<HordeImage> {
        if !status.get("done").and_then(Value::as_bool).unwrap_or(false) {
            return None;
        }
        let img = status
            .get("generations")?
            .as_array()?
            .first()?
            .get("img")?
            .as_str()?
            .trim();
        if img.is_empty() {
            None
        } else if img.starts_with("http://") || img.starts_with("https://") {
            Some(HordeImage::Url(img.to_string()))
        } else {
            Some(HordeImage::Base64(img.to_string()))
        }
    }

    async fn fetch_image(&self, client: &reqwest::Client, image: HordeImage) -> Result<Vec<u8>> {
        match image {
            HordeImage::Base64(data) => STANDARD
                .decode(data.as_bytes())
                .map_err(|e| BotError::malformed("horde", format!("bad base64 image: {}", e))),
            HordeImage::Url(url) => {
                let response = client.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(BotError::Api {
                        service: "horde".to_string(),
                        status: response.status().as_u16(),
                        body: String::new(),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            }
        }
    }
}

#[async_trait]
impl ImageBackend for HordeClient {
    fn name(&self) -> &'static str {
        "horde"
    }

    async fn try_generate(&self, prompt: &str) -> Result<Option<Vec<u8>>> {
        let client = http_client(Duration::from_secs(20))?;
        let submitted = client
            .post(self.url("/v2/generate/async"))
            .header("apikey", &self.api_key)
            .header("accept", "application/json")
            .json(&self.submit_body(prompt))
            .send()
            .await?;
        let submitted = read_json("horde", submitted).await?;
        let Some(job_id) = submitted.get("id").and_then(Value::as_str) else {
            return Err(BotError::malformed("horde", "no job id"));
        };

        let status_url = self.url(&format!("/v2/generate/status/{}", job_id));
        for _ in 0..self.max_polls {
            let response = client
                .get(&status_url)
                .header("apikey", &self.api_key)
                .header("accept", "application/json")
                .send()
                .await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let status = read_json("horde", response).await?;
            if let Some(image) = Self::parse_status(&status) {
                return self.fetch_image(&client, image).await.map(Some);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        log::warn!("Horde job {} not done after {} polls", job_id, self.max_polls);
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// ComfyUI
// ---------------------------------------------------------------------------

/// Location of a saved image in ComfyUI's output folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComfyImageRef {
    pub filename: String,
    pub subfolder: String,
    pub kind: String,
}

#[derive(Debug, Clone)]
pub struct ComfyClient {
    pub base_url: String,
    pub checkpoint: String,
    pub negative_prompt: String,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub width: u32,
    pub height: u32,
}

impl ComfyClient {
    /// `None` unless `COMFY_BASE_URL` is set.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let base_url = config.comfy_base_url.clone()?;
        Some(Self {
            base_url,
            checkpoint: config
                .comfy_checkpoint
                .clone()
                .unwrap_or_else(|| "sd_xl_base_1.0.safetensors".to_string()),
            negative_prompt: config
                .horde_negative_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_NEGATIVE_PROMPT.to_string()),
            timeout: Duration::from_secs(config.comfy_timeout_s.max(1)),
            poll_interval: Duration::from_secs(1),
            width: 832,
            height: 1216,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// SDXL txt2img graph in ComfyUI's API format.
    pub fn workflow(&self, prompt: &str, seed: u64) -> Value {
        json!({
            "4": {
                "class_type": "CheckpointLoaderSimple",
                "inputs": {"ckpt_name": self.checkpoint},
            },
            "5": {
                "class_type": "EmptyLatentImage",
                "inputs": {"width": self.width, "height": self.height, "batch_size": 1},
            },
            "6": {
                "class_type": "CLIPTextEncode",
                "inputs": {"text": prompt, "clip": ["4", 1]},
            },
            "7": {
                "class_type": "CLIPTextEncode",
                "inputs": {"text": self.negative_prompt, "clip": ["4", 1]},
            },
            "3": {
                "class_type": "KSampler",
                "inputs": {
                    "seed": seed,
                    "steps": 25,
                    "cfg": 7.0,
                    "sampler_name": "euler",
                    "scheduler": "normal",
                    "denoise": 1.0,
                    "model": ["4", 0],
                    "positive": ["6", 0],
                    "negative": ["7", 0],
                    "latent_image": ["5", 0],
                },
            },
            "8": {
                "class_type": "VAEDecode",
                "inputs": {"samples": ["3", 0], "vae": ["4", 2]},
            },
            "9": {
                "class_type": "SaveImage",
                "inputs": {"filename_prefix": "stoabot", "images": ["8", 0]},
            },
        })
    }

    /// First output image recorded for `prompt_id` in a `/history` payload.
    pub fn parse_history(history: &Value, prompt_id: &str) -> Option<ComfyImageRef> {
        let outputs = history.get(prompt_id)?.get("outputs")?.as_object()?;
        outputs.values().find_map(|node| {
            let image = node.get("images")?.as_array()?.first()?;
            Some(ComfyImageRef {
                filename: image.get("filename")?.as_str()?.to_string(),
                subfolder: image
                    .get("subfolder")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                kind: image
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("output")
                    .to_string(),
            })
        })
    }

    pub fn view_url(&self, image: &ComfyImageRef) -> String {
        self.url(&format!(
            "/view?filename={}&subfolder={}&type={}",
            urlencoding::encode(&image.filename),
            urlencoding::encode(&image.subfolder),
            urlencoding::encode(&image.kind)
        ))
    }
}

#[async_trait]
impl ImageBackend for ComfyClient {
    fn name(&self) -> &'static str {
        "comfyui"
    }

    async fn try_generate(&self, prompt: &str) -> Result<Option<Vec<u8>>> {
        let seed: u64 = rand::rng().random_range(0..u32::MAX as u64);
        let client = http_client(Duration::from_secs(30))?;
        let submitted = client
            .post(self.url("/prompt"))
            .json(&json!({
                "prompt": self.workflow(prompt, seed),
                "client_id": uuid::Uuid::new_v4().to_string(),
            }))
            .send()
            .await?;
        let submitted = read_json("comfyui", submitted).await?;
        let Some(prompt_id) = submitted.get("prompt_id").and_then(Value::as_str) else {
            return Err(BotError::malformed("comfyui", "no prompt_id"));
        };

        let history_url = self.url(&format!("/history/{}", prompt_id));
        let started = tokio::time::Instant::now();
        while started.elapsed() < self.timeout {
            let history = read_json("comfyui", client.get(&history_url).send().await?).await?;
            if let Some(image) = Self::parse_history(&history, prompt_id) {
                let response = client.get(self.view_url(&image)).send().await?;
                if !response.status().is_success() {
                    return Err(BotError::Api {
                        service: "comfyui".to_string(),
                        status: response.status().as_u16(),
                        body: String::new(),
                    });
                }
                return Ok(Some(response.bytes().await?.to_vec()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        log::warn!("ComfyUI prompt {} not done within {:?}", prompt_id, self.timeout);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_map(&map)
    }

    #[test]
    fn test_horde_defaults_and_body() {
        let horde = HordeClient::from_config(&config(&[("HORDE_NEGATIVE_PROMPT", "text, logo")]));
        assert_eq!(horde.base_url, DEFAULT_HORDE_URL);
        assert_eq!(horde.api_key, ANONYMOUS_HORDE_KEY);
        assert_eq!(horde.max_polls, 60);

        let body = horde.submit_body("greek warrior, moody");
        assert_eq!(body["prompt"], "greek warrior, moody ### text, logo");
        assert_eq!(body["params"]["sampler_name"], "k_euler_a");
        assert_eq!(body["r2"], true);
        assert!(body.get("models").is_none());
    }

    #[test]
    fn test_horde_parse_status() {
        assert_eq!(HordeClient::parse_status(&json!({"done": false})), None);
        assert_eq!(
            HordeClient::parse_status(&json!({"done": true, "generations": [{"img": "https://r2/x.webp"}]})),
            Some(HordeImage::Url("https://r2/x.webp".into()))
        );
        assert_eq!(
            HordeClient::parse_status(&json!({"done": true, "generations": [{"img": "aGVsbG8="}]})),
            Some(HordeImage::Base64("aGVsbG8=".into()))
        );
        assert_eq!(HordeClient::parse_status(&json!({"done": true, "generations": []})), None);
    }

    #[tokio::test]
    async fn test_horde_base64_decode() {
        let horde = HordeClient::from_config(&AppConfig::default());
        let client = reqwest::Client::new();
        let bytes = horde
            .fetch_image(&client, HordeImage::Base64("aGVsbG8=".into()))
            .await
            .unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_comfy_requires_base_url() {
        assert!(ComfyClient::from_config(&AppConfig::default()).is_none());
        let comfy = ComfyClient::from_config(&config(&[
            ("COMFY_BASE_URL", "http://127.0.0.1:8188/"),
            ("COMFY_TIMEOUT_S", "5"),
        ]))
        .unwrap();
        assert_eq!(comfy.timeout, Duration::from_secs(5));
        assert_eq!(comfy.url("/prompt"), "http://127.0.0.1:8188/prompt");
    }

    #[test]
    fn test_comfy_workflow_wiring() {
        let comfy = ComfyClient::from_config(&config(&[("COMFY_BASE_URL", "http://h")])).unwrap();
        let graph = comfy.workflow("chess match, dark", 42);
        assert_eq!(graph["6"]["inputs"]["text"], "chess match, dark");
        assert_eq!(graph["3"]["inputs"]["seed"], 42);
        assert_eq!(graph["3"]["inputs"]["positive"], json!(["6", 0]));
        assert_eq!(graph["9"]["class_type"], "SaveImage");
    }

    #[test]
    fn test_comfy_parse_history() {
        let history = json!({
            "abc": {"outputs": {"9": {"images": [
                {"filename": "stoabot_0001_.png", "subfolder": "", "type": "output"}
            ]}}}
        });
        let image = ComfyClient::parse_history(&history, "abc").unwrap();
        assert_eq!(image.filename, "stoabot_0001_.png");
        assert_eq!(image.kind, "output");
        assert_eq!(ComfyClient::parse_history(&json!({}), "abc"), None);

        let comfy = ComfyClient::from_config(&config(&[("COMFY_BASE_URL", "http://h")])).unwrap();
        assert_eq!(
            comfy.view_url(&image),
            "http://h/view?filename=stoabot_0001_.png&subfolder=&type=output"
        );
    }

    #[test]
    fn test_generator_order() {
        let gen = BackgroundGenerator::from_config(&config(&[("COMFY_BASE_URL", "http://h")]));
        assert_eq!(gen.names(), vec!["comfyui", "horde"]);
        let gen = BackgroundGenerator::from_config(&AppConfig::default());
        assert_eq!(gen.names(), vec!["horde"]);
    }

    #[tokio::test]
    async fn test_unreachable_backends_yield_none() {
        let mut horde = HordeClient::from_config(&AppConfig::default());
        horde.base_url = "http://127.0.0.1:9".into();
        let comfy = ComfyClient::from_config(&config(&[("COMFY_BASE_URL", "http://127.0.0.1:9")])).unwrap();
        let gen = BackgroundGenerator::new(vec![Box::new(comfy), Box::new(horde)]);
        assert_eq!(gen.generate("anything").await, None);
    }
}
