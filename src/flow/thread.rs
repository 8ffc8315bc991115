//! Batched fact threads.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::llms::{EngineSelection, GenerationChain, GenerationMode};
use crate::state::RecentPosts;
use crate::utilities::prompts::fact_prompt;
use crate::utilities::string_utils::{sanitize_ascii, truncate_chars};

/// Items wanted per thread.
pub const THREAD_ITEMS: usize = 10;
/// Generation calls allowed while collecting items.
pub const THREAD_MAX_ATTEMPTS: usize = 50;

static LEADING_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*fun\s+fact\s*:\s*").expect("valid regex"));

/// `"<n> facts about <subject>:"`
pub fn thread_header(count: usize, subject: &str) -> String {
    format!("{} facts about {}:", count, subject.trim())
}

/// Fact text without its leading phrase, for numbering inside a thread.
pub fn item_body(fact: &str) -> String {
    let body = LEADING_PHRASE.replace(fact, "");
    let body = body.trim();
    let mut chars = body.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Header followed by `"<i>. <text>"` items, each clamped to `limit`.
pub fn thread_texts(subject: &str, facts: &[String], limit: i64) -> Vec<String> {
    let mut texts = Vec::with_capacity(facts.len() + 1);
    texts.push(truncate_chars(&thread_header(facts.len(), subject), limit));
    for (i, fact) in facts.iter().enumerate() {
        texts.push(truncate_chars(&format!("{}. {}", i + 1, item_body(fact)), limit));
    }
    texts
}

/// Collect up to [`THREAD_ITEMS`] facts not seen in `recent` nor already
/// collected, using at most [`THREAD_MAX_ATTEMPTS`] generation calls.
pub async fn collect_thread_facts(
    chain: &GenerationChain,
    subject: &str,
    selection: EngineSelection,
    recent: &RecentPosts,
) -> Vec<String> {
    let prompt = fact_prompt(subject);
    let mut facts: Vec<String> = Vec::with_capacity(THREAD_ITEMS);
    let mut attempts = 0;

    while facts.len() < THREAD_ITEMS && attempts < THREAD_MAX_ATTEMPTS {
        attempts += 1;
        let generation = chain.generate(&prompt, selection, GenerationMode::Fact).await;
        let text = sanitize_ascii(generation.text.trim());
        if text.is_empty() || recent.contains(&text) || facts.contains(&text) {
            continue;
        }
        facts.push(text);
    }

    if facts.len() < THREAD_ITEMS {
        log::warn!(
            "Collected {} of {} thread facts in {} attempts",
            facts.len(),
            THREAD_ITEMS,
            attempts
        );
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::llms::{EngineKind, EngineOutcome, EngineRequest, TextEngine};

    /// Cycles through `distinct` different facts.
    #[derive(Debug)]
    struct CyclingEngine {
        distinct: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextEngine for CyclingEngine {
        fn kind(&self) -> EngineKind {
            EngineKind::Provider
        }

        async fn generate(&self, _request: &EngineRequest) -> EngineOutcome {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            EngineOutcome::Text(format!("fact number {}", n % self.distinct))
        }
    }

    fn chain(distinct: usize) -> (GenerationChain, Arc<CyclingEngine>) {
        let engine = Arc::new(CyclingEngine {
            distinct,
            calls: AtomicUsize::new(0),
        });
        let engines: Vec<Arc<dyn TextEngine>> = vec![engine.clone()];
        (GenerationChain::new(engines, 220), engine)
    }

    #[test]
    fn test_thread_texts_layout() {
        let facts = vec![
            "Fun fact: owls cannot move their eyes.".to_string(),
            "Fun fact: a day on Venus is longer than its year.".to_string(),
        ];
        let texts = thread_texts("nature", &facts, 220);
        assert_eq!(texts[0], "2 facts about nature:");
        assert_eq!(texts[1], "1. Owls cannot move their eyes.");
        assert_eq!(texts[2], "2. A day on Venus is longer than its year.");
    }

    #[test]
    fn test_thread_items_respect_limit() {
        let facts = vec![format!("Fun fact: {}", "x".repeat(400))];
        let texts = thread_texts("x", &facts, 1000);
        assert_eq!(texts[1].chars().count(), 275);
    }

    #[tokio::test]
    async fn test_collects_ten_unique() {
        let (chain, engine) = chain(100);
        let facts = collect_thread_facts(&chain, "space", EngineSelection::Auto, &RecentPosts::default()).await;
        assert_eq!(facts.len(), THREAD_ITEMS);
        assert_eq!(engine.calls.load(Ordering::SeqCst), THREAD_ITEMS);
        assert!(facts.iter().all(|f| f.starts_with("Fun fact: ")));
    }

    #[tokio::test]
    async fn test_skips_recent_and_stops_at_attempt_cap() {
        let (chain, engine) = chain(4);
        let mut recent = RecentPosts::default();
        recent.push("Fun fact: fact number 0.");
        let facts = collect_thread_facts(&chain, "space", EngineSelection::Auto, &recent).await;
        assert_eq!(facts.len(), 3);
        assert!(!facts.contains(&"Fun fact: fact number 0.".to_string()));
        assert_eq!(engine.calls.load(Ordering::SeqCst), THREAD_MAX_ATTEMPTS);
    }
}
