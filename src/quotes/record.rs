//! Quote record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    /// Opaque unique token (UUID v4).
    pub id: String,
    /// Raw text as ingested (trimmed).
    pub text: String,
    /// Optional attribution.
    #[serde(default)]
    pub author: Option<String>,
    /// Label of the ingestion source (file name, API name).
    #[serde(default)]
    pub source: String,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub last_posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub times_posted: u32,
}

impl QuoteRecord {
    /// Text with the author appended as `"text" - author` when known.
    pub fn display_text(&self) -> String {
        attributed(&self.text, self.author.as_deref())
    }
}

/// `"text" - author`, or the bare text when there is no author.
pub fn attributed(text: &str, author: Option<&str>) -> String {
    match author.map(str::trim) {
        Some(author) if !author.is_empty() => format!("\"{}\" - {}", text, author),
        _ => text.to_string(),
    }
}

/// Input to [`crate::quotes::QuoteStore::ingest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteCandidate {
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
}

impl QuoteCandidate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: None,
        }
    }

    pub fn with_author(text: impl Into<String>, author: Option<String>) -> Self {
        Self {
            text: text.into(),
            author: author.filter(|a| !a.trim().is_empty()),
        }
    }

    pub fn display_text(&self) -> String {
        attributed(&self.text, self.author.as_deref())
    }
}

impl From<&str> for QuoteCandidate {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Outcome of an ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub added: usize,
    pub duplicates: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(author: Option<&str>) -> QuoteRecord {
        QuoteRecord {
            id: "id".into(),
            text: "Waste no more time arguing what a good man should be. Be one.".into(),
            author: author.map(String::from),
            source: "test".into(),
            added_at: Utc::now(),
            last_posted_at: None,
            times_posted: 0,
        }
    }

    #[test]
    fn test_display_text_with_author() {
        let text = record(Some("Marcus Aurelius")).display_text();
        assert!(text.starts_with('"'));
        assert!(text.ends_with("\" - Marcus Aurelius"));
    }

    #[test]
    fn test_display_text_without_author() {
        let r = record(Some("  "));
        assert_eq!(r.display_text(), r.text);
        assert_eq!(record(None).display_text(), r.text);
    }

    #[test]
    fn test_deserialize_missing_optional_fields() {
        let json = r#"{"id":"a","text":"x","added_at":"2024-01-01T00:00:00Z"}"#;
        let r: QuoteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.times_posted, 0);
        assert!(r.last_posted_at.is_none());
        assert!(r.author.is_none());
    }

    #[test]
    fn test_candidate_drops_blank_author() {
        let c = QuoteCandidate::with_author("x", Some(" ".into()));
        assert!(c.author.is_none());
    }
}
