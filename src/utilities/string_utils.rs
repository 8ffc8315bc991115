//! String utility functions.
//!
//! Dedup keys, ASCII sanitization of post text and the platform length clamp.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Hard platform ceiling applied after the configured limit.
pub const PLATFORM_MAX_CHARS: usize = 275;

fn unify_dash_and_quote(c: char) -> Option<&'static str> {
    match c {
        '\u{2014}' | '\u{2013}' | '\u{2012}' | '\u{2212}' | '\u{2010}' | '\u{2011}' => Some("-"),
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => Some("'"),
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => Some("\""),
        _ => None,
    }
}

/// Canonical form used as the quote store's identity key.
///
/// Case-folded, whitespace-collapsed, dash/quote-normalized. All other
/// punctuation is kept, so "Be water." and "Be Water!" stay distinct.
pub fn normalize_key(text: &str) -> String {
    let mut unified = String::with_capacity(text.len());
    for c in text.trim().chars() {
        match unify_dash_and_quote(c) {
            Some(rep) => unified.push_str(rep),
            None => unified.push(c),
        }
    }
    let lowered = unified.to_lowercase();
    WHITESPACE_RUN.replace_all(&lowered, " ").into_owned()
}

/// Replace typographic dashes, quotes, ellipses and non-breaking spaces with
/// plain ASCII equivalents.
pub fn sanitize_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' | '\u{202F}' | '\u{2009}' => out.push(' '),
            _ => match unify_dash_and_quote(c) {
                Some(rep) => out.push_str(rep),
                None => out.push(c),
            },
        }
    }
    out
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// `min(max(limit, 1), 275)`.
pub fn effective_limit(limit: i64) -> usize {
    (limit.max(1) as u64).min(PLATFORM_MAX_CHARS as u64) as usize
}

/// Clamp `text` to the effective limit, counted in characters.
pub fn truncate_chars(text: &str, limit: i64) -> String {
    let max = effective_limit(limit);
    text.chars().take(max).collect()
}

/// Shorten `text` to at most `width` characters on a word boundary,
/// appending `placeholder` when anything was cut.
pub fn shorten(text: &str, width: usize, placeholder: &str) -> String {
    let collapsed = collapse_whitespace(text);
    if collapsed.chars().count() <= width {
        return collapsed;
    }
    let budget = width.saturating_sub(placeholder.chars().count());
    let mut out = String::new();
    for word in collapsed.split(' ') {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + word.chars().count() > budget {
            break;
        }
        if extra == 1 {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        return placeholder.trim().to_string();
    }
    out.push_str(placeholder);
    out
}
