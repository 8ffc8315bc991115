//! Cleanup of raw engine output.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::llms::engine::GenerationMode;
use crate::utilities::prompts::FACT_LEADING_PHRASE;

static ROLE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(assistant|user|system)\s*:\s*").expect("valid regex"));

/// An `assistant:` role marker opening a line.
static ASSISTANT_TURN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*assistant[ \t]*:[ \t]*").expect("valid regex"));

static TRAILING_ROLE_TURN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\n\s*(user|system)\s*:.*$").expect("valid regex"));

static FACT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^fun\s+fact\s*[:\-]?\s*").expect("valid regex"));

const WRAPPING: &[char] = &['"', '\'', '`', '\u{201c}', '\u{201d}', '\u{2018}', '\u{2019}'];

/// Clean raw engine output for `mode`.
///
/// `prompt` is the user prompt sent to the engine; an echo of it at the
/// start of the output is removed.
pub fn normalize_output(raw: &str, prompt: &str, mode: GenerationMode) -> String {
    let mut text = raw.trim().to_string();

    // Keep only what follows the last assistant turn marker.
    if let Some(m) = ASSISTANT_TURN.find_iter(&text).last() {
        text = text[m.end()..].to_string();
    }
    text = TRAILING_ROLE_TURN.replace(&text, "").into_owned();

    let prompt = prompt.trim();
    if !prompt.is_empty() {
        if let Some(rest) = text.trim_start().strip_prefix(prompt) {
            text = rest.to_string();
        }
    }

    loop {
        let stripped = ROLE_PREFIX.replace(&text, "").into_owned();
        let stripped = stripped.trim().trim_matches(WRAPPING).trim().to_string();
        if stripped == text {
            break;
        }
        text = stripped;
    }

    match mode {
        GenerationMode::Tweet => text,
        GenerationMode::Fact => enforce_fact_shape(&text),
    }
}

/// Required leading phrase plus terminal punctuation.
pub fn enforce_fact_shape(text: &str) -> String {
    let body = FACT_PREFIX.replace(text.trim(), "");
    let body = body.trim();
    if body.is_empty() {
        return String::new();
    }
    let mut out = format!("{} {}", FACT_LEADING_PHRASE, body);
    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    out
}
