//! External quote sources.
//!
//! Each source fetches one short piece of quotable text from a public API.
//! Failures are logged and reported as `None`; [`fetch_rotating`] tries the
//! sources in a shuffled order and returns the first success.

pub mod gutenberg;
pub mod stoic;
pub mod wikipedia;
pub mod zenquotes;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::quotes::QuoteCandidate;
use crate::utilities::errors::Result;

pub use gutenberg::GutenbergSource;
pub use stoic::StoicQuoteSource;
pub use wikipedia::WikiSummarySource;
pub use zenquotes::ZenQuotesSource;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A remote source of quotable text.
#[async_trait]
pub trait QuoteSource: Send + Sync + fmt::Debug {
    /// Short label stored as the quote's `source`.
    fn name(&self) -> &'static str;

    /// Fetch one candidate.
    async fn try_fetch(&self) -> Result<Option<QuoteCandidate>>;

    /// Fetch one candidate, swallowing every failure.
    async fn fetch(&self) -> Option<QuoteCandidate> {
        match self.try_fetch().await {
            Ok(Some(candidate)) if !candidate.text.trim().is_empty() => Some(candidate),
            Ok(_) => {
                log::debug!("{} returned nothing usable", self.name());
                None
            }
            Err(e) => {
                log::warn!("{} fetch failed: {}", self.name(), e);
                None
            }
        }
    }
}

/// The sources used by `fetch_rotating` when nothing else is given.
pub fn rotating_sources() -> Vec<Box<dyn QuoteSource>> {
    vec![
        Box::new(ZenQuotesSource::default()),
        Box::new(WikiSummarySource::default()),
        Box::new(GutenbergSource::default()),
    ]
}

/// Try `sources` in a shuffled order; first success wins.
pub async fn fetch_rotating(
    sources: &[Box<dyn QuoteSource>],
) -> Option<(QuoteCandidate, &'static str)> {
    let mut order: Vec<usize> = (0..sources.len()).collect();
    order.shuffle(&mut rand::rng());

    for idx in order {
        let source = &sources[idx];
        if let Some(candidate) = source.fetch().await {
            log::info!("Fetched quote from {}", source.name());
            return Some((candidate, source.name()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::errors::BotError;

    #[derive(Debug)]
    struct FixedSource {
        name: &'static str,
        text: Option<&'static str>,
    }

    #[async_trait]
    impl QuoteSource for FixedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn try_fetch(&self) -> Result<Option<QuoteCandidate>> {
            match self.text {
                Some(t) => Ok(Some(QuoteCandidate::new(t))),
                None => Err(BotError::malformed(self.name, "down")),
            }
        }
    }

    #[tokio::test]
    async fn test_rotating_returns_only_success() {
        let sources: Vec<Box<dyn QuoteSource>> = vec![
            Box::new(FixedSource { name: "a", text: None }),
            Box::new(FixedSource { name: "b", text: Some("Amor fati.") }),
            Box::new(FixedSource { name: "c", text: None }),
        ];
        for _ in 0..10 {
            let (candidate, name) = fetch_rotating(&sources).await.unwrap();
            assert_eq!(candidate.text, "Amor fati.");
            assert_eq!(name, "b");
        }
    }

    #[tokio::test]
    async fn test_rotating_all_fail() {
        let sources: Vec<Box<dyn QuoteSource>> = vec![
            Box::new(FixedSource { name: "a", text: None }),
            Box::new(FixedSource { name: "b", text: Some("   ") }),
        ];
        assert!(fetch_rotating(&sources).await.is_none());
        assert!(fetch_rotating(&[]).await.is_none());
    }

    #[test]
    fn test_default_rotation() {
        let names: Vec<&str> = rotating_sources().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["zenquotes", "wikipedia", "gutenberg"]);
    }
}
