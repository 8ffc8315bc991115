//! Social platform client.
//!
//! Posts through the v2 tweets endpoint and uploads media through the v1.1
//! upload endpoint, both signed with OAuth 1.0a user-context credentials.
//! Rate limits (429) are retried internally; every other failure is printed
//! as a status line and reported as `None`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::oauth::OAuthCredentials;
use super::Poster;
use crate::llms::providers::utils::{backoff_delay, http_client, read_json};
use crate::utilities::config::AppConfig;
use crate::utilities::errors::{BotError, Result};
use crate::utilities::printer::{Printer, Status};

const SERVICE: &str = "twitter";

pub const DEFAULT_API_BASE: &str = "https://api.twitter.com";
pub const DEFAULT_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";

/// Longest wait honoured for a rate-limit reset.
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
pub struct TwitterClient {
    credentials: Option<OAuthCredentials>,
    missing: Vec<&'static str>,
    pub api_base: String,
    pub upload_url: String,
    /// Sleep until the advertised reset instead of backing off.
    pub wait_on_rate_limit: bool,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub timeout: Duration,
    printer: Printer,
}

/// How long to wait before retrying after a 429.
pub fn rate_limit_wait(
    reset_at: Option<i64>,
    now: i64,
    attempt: u32,
    wait_on_rate_limit: bool,
    backoff_base: Duration,
) -> Duration {
    match reset_at {
        Some(reset) if wait_on_rate_limit => {
            let secs = (reset - now).max(0) as u64 + 1;
            Duration::from_secs(secs).min(MAX_RATE_LIMIT_WAIT)
        }
        _ => backoff_delay(backoff_base, attempt).min(MAX_RATE_LIMIT_WAIT),
    }
}

/// Request body for `POST /2/tweets`.
pub fn tweet_body(text: &str, reply_to: Option<&str>, media_ids: &[String]) -> Value {
    let mut body = json!({ "text": text });
    if let Some(id) = reply_to {
        body["reply"] = json!({ "in_reply_to_tweet_id": id });
    }
    if !media_ids.is_empty() {
        body["media"] = json!({ "media_ids": media_ids });
    }
    body
}

/// `data.id` from a create-tweet response.
pub fn parse_tweet_id(response: &Value) -> Option<String> {
    response
        .get("data")?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

/// `media_id_string` from an upload response.
pub fn parse_media_id(response: &Value) -> Option<String> {
    response
        .get("media_id_string")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| response.get("media_id").and_then(Value::as_u64).map(|n| n.to_string()))
}

impl TwitterClient {
    pub fn from_config(config: &AppConfig, printer: Printer) -> Self {
        let creds = &config.twitter;
        let credentials = match (
            &creds.api_key,
            &creds.api_key_secret,
            &creds.access_token,
            &creds.access_token_secret,
        ) {
            (Some(ck), Some(cs), Some(t), Some(ts)) => Some(OAuthCredentials {
                consumer_key: ck.clone(),
                consumer_secret: cs.clone(),
                token: t.clone(),
                token_secret: ts.clone(),
            }),
            _ => None,
        };
        Self {
            credentials,
            missing: creds.missing(),
            api_base: DEFAULT_API_BASE.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            wait_on_rate_limit: config.twitter_wait_on_rate_limit,
            max_attempts: 3,
            backoff_base: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
            printer,
        }
    }

    pub fn with_credentials(mut self, credentials: OAuthCredentials) -> Self {
        self.credentials = Some(credentials);
        self.missing.clear();
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    fn credentials(&self) -> Option<&OAuthCredentials> {
        if self.credentials.is_none() {
            self.printer.status(
                Status::Error,
                &format!("Missing platform credentials: {}", self.missing.join(", ")),
            );
        }
        self.credentials.as_ref()
    }

    fn tweets_url(&self) -> String {
        format!("{}/2/tweets", self.api_base.trim_end_matches('/'))
    }

    /// Run `op`, retrying rate limits up to `max_attempts`.
    async fn with_rate_limit_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Err(BotError::RateLimited { service, reset_at }) if attempt + 1 < attempts => {
                    let wait = rate_limit_wait(
                        reset_at,
                        chrono::Utc::now().timestamp(),
                        attempt,
                        self.wait_on_rate_limit,
                        self.backoff_base,
                    );
                    self.printer.status(
                        Status::RateLimit,
                        &format!(
                            "{} limited on {} (attempt {}/{}); waiting {}s",
                            service,
                            what,
                            attempt + 1,
                            attempts,
                            wait.as_secs()
                        ),
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn create_tweet(
        &self,
        creds: &OAuthCredentials,
        text: &str,
        reply_to: Option<&str>,
        media_ids: &[String],
    ) -> Result<String> {
        let url = self.tweets_url();
        let body = tweet_body(text, reply_to, media_ids);
        let client = http_client(self.timeout)?;
        let (url, body, client) = (url.as_str(), &body, &client);

        self.with_rate_limit_retry("create tweet", move || async move {
            let auth = creds.authorize("POST", url, &[])?;
            let response = client
                .post(url)
                .header("Authorization", auth)
                .json(&body)
                .send()
                .await?;
            let json = read_json(SERVICE, response).await?;
            parse_tweet_id(&json).ok_or_else(|| BotError::malformed(SERVICE, "no tweet id in response"))
        })
        .await
    }

    async fn upload_media(
        &self,
        creds: &OAuthCredentials,
        image: &[u8],
        filename: &str,
    ) -> Result<String> {
        let client = http_client(self.timeout)?;
        let client = &client;
        let mime = if filename.to_ascii_lowercase().ends_with(".png") {
            "image/png"
        } else {
            "image/jpeg"
        };

        self.with_rate_limit_retry("media upload", move || async move {
            let part = reqwest::multipart::Part::bytes(image.to_vec())
                .file_name(filename.to_string())
                .mime_str(mime)?;
            let form = reqwest::multipart::Form::new().part("media", part);
            let auth = creds.authorize("POST", &self.upload_url, &[])?;
            let response = client
                .post(&self.upload_url)
                .header("Authorization", auth)
                .multipart(form)
                .send()
                .await?;
            let json = read_json(SERVICE, response).await?;
            parse_media_id(&json).ok_or_else(|| BotError::malformed(SERVICE, "no media id in response"))
        })
        .await
    }

    fn report(&self, what: &str, error: &BotError) {
        match error {
            BotError::RateLimited { .. } => self.printer.status(
                Status::RateLimit,
                &format!("Rate limit persisted; giving up on {}.", what),
            ),
            other => {
                log::error!("{} failed: {}", what, other);
                self.printer
                    .status(Status::Error, &format!("{} failed: {}", what, other));
            }
        }
    }

    fn guard_text(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            self.printer
                .status(Status::Error, "Empty tweet text; skipping post.");
            return false;
        }
        true
    }
}

#[async_trait]
impl Poster for TwitterClient {
    async fn post_tweet(&self, text: &str) -> Option<String> {
        if !self.guard_text(text) {
            return None;
        }
        let creds = self.credentials()?;
        match self.create_tweet(creds, text, None, &[]).await {
            Ok(id) => Some(id),
            Err(e) => {
                self.report("Post", &e);
                None
            }
        }
    }

    async fn upload_media_and_post(
        &self,
        text: &str,
        image: &[u8],
        filename: &str,
    ) -> Option<String> {
        if !self.guard_text(text) {
            return None;
        }
        let creds = self.credentials()?;
        let media_id = match self.upload_media(creds, image, filename).await {
            Ok(id) => id,
            Err(e) => {
                self.report("Media upload", &e);
                return None;
            }
        };
        match self
            .create_tweet(creds, text, None, std::slice::from_ref(&media_id))
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                self.report("Media post", &e);
                None
            }
        }
    }

    async fn post_thread(&self, texts: &[String]) -> Vec<String> {
        let mut ids = Vec::new();
        if texts.is_empty() || !texts.iter().all(|t| self.guard_text(t)) {
            return ids;
        }
        let Some(creds) = self.credentials() else {
            return ids;
        };
        for (i, text) in texts.iter().enumerate() {
            let reply_to = ids.last().map(String::as_str);
            match self.create_tweet(creds, text, reply_to, &[]).await {
                Ok(id) => ids.push(id),
                Err(e) => {
                    self.report(&format!("Thread item {}", i + 1), &e);
                    break;
                }
            }
        }
        ids
    }
}
