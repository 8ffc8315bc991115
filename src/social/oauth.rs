//! OAuth 1.0a request signing (HMAC-SHA1, user context).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::utilities::errors::{BotError, Result};

type HmacSha1 = Hmac<Sha1>;

/// Consumer and access-token key pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

/// RFC 3986 percent-encoding; only `A-Z a-z 0-9 - . _ ~` pass through.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `METHOD&url&sorted-params`, every component percent-encoded.
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    )
}

/// Base64 HMAC-SHA1 of `base` keyed by `consumer_secret&token_secret`.
pub fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> Result<String> {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| BotError::config(format!("invalid signing key: {}", e)))?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Random nonce for one request.
pub fn generate_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl OAuthCredentials {
    /// `Authorization` header value for a request.
    ///
    /// `extra_params` are query or form parameters that take part in the
    /// signature; JSON and multipart bodies do not.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        extra_params: &[(String, String)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String> {
        let mut oauth_params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), self.consumer_key.clone()),
            ("oauth_nonce".into(), nonce.to_string()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), timestamp.to_string()),
            ("oauth_token".into(), self.token.clone()),
            ("oauth_version".into(), "1.0".into()),
        ];

        let mut all = oauth_params.clone();
        all.extend_from_slice(extra_params);
        let base = signature_base_string(method, url, &all);
        let signature = sign(&base, &self.consumer_secret, &self.token_secret)?;

        oauth_params.push(("oauth_signature".into(), signature));
        oauth_params.sort();
        let fields = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {}", fields))
    }

    /// Header for a request signed now with a fresh nonce.
    pub fn authorize(&self, method: &str, url: &str, extra_params: &[(String, String)]) -> Result<String> {
        self.authorization_header(
            method,
            url,
            extra_params,
            &generate_nonce(),
            chrono::Utc::now().timestamp(),
        )
    }
}
