//! Deterministic heuristic engine.
//!
//! Picks a canned line from a small themed table. Themes whose keywords
//! appear in the prompt are weighted up. No network, no model.

use async_trait::async_trait;
use rand::Rng;

use crate::llms::engine::{EngineKind, EngineOutcome, EngineRequest, GenerationMode, TextEngine};

/// One theme of canned lines.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub tweets: &'static [&'static str],
    pub facts: &'static [&'static str],
}

pub const THEMES: &[Theme] = &[
    Theme {
        name: "stoic",
        keywords: &["stoic", "stoicism", "marcus", "aurelius", "seneca", "epictetus", "virtue", "philosoph"],
        tweets: &[
            "You control your effort and your judgment. Let the rest go.",
            "The obstacle is part of the path. Work with it, not against it.",
            "Calm is a skill. Practice it when nothing is at stake.",
        ],
        facts: &[
            "Fun fact: Marcus Aurelius wrote his Meditations as private notes and never meant them to be published.",
            "Fun fact: Epictetus was born a slave and went on to teach philosophy in Nicopolis.",
            "Fun fact: Stoicism takes its name from the Stoa Poikile, a painted porch in Athens where Zeno taught.",
        ],
    },
    Theme {
        name: "chess",
        keywords: &["chess", "gambit", "checkmate", "opening", "endgame", "grandmaster"],
        tweets: &[
            "Control the center first. Everything else gets easier.",
            "Every move is a trade between time and position. Spend both on purpose.",
        ],
        facts: &[
            "Fun fact: The longest possible chess game under the fifty-move rule runs to about 5,949 moves.",
            "Fun fact: The word checkmate comes from the Persian phrase shah mat, meaning the king is helpless.",
        ],
    },
    Theme {
        name: "strategy",
        keywords: &["war", "battle", "strategy", "sun tzu", "army", "soldier", "tactic", "campaign"],
        tweets: &[
            "Win the fight before it starts: prepare where others improvise.",
            "Strategy is choosing what not to do.",
        ],
        facts: &[
            "Fun fact: The Art of War is traditionally credited to Sun Tzu, a general said to have served the state of Wu.",
            "Fun fact: At Thermopylae the Greek force held the pass for three days before being outflanked.",
        ],
    },
    Theme {
        name: "discipline",
        keywords: &["discipline", "habit", "focus", "routine", "training", "consisten"],
        tweets: &[
            "Discipline is remembering what you want most, not what you want now.",
            "Small reps, every day. Consistency compounds quietly.",
        ],
        facts: &[
            "Fun fact: Studies of habit formation found the median time to automaticity was about 66 days.",
        ],
    },
    Theme {
        name: "general",
        keywords: &[],
        tweets: &[
            "Do the next right thing, then do it again.",
            "Clarity comes from action, not from thinking about action.",
        ],
        facts: &[
            "Fun fact: Honey found in ancient Egyptian tombs was still edible thousands of years later.",
            "Fun fact: Octopuses have three hearts and blue blood.",
        ],
    },
];

/// Selection weight of `theme` for `prompt`: 1 plus 3 per keyword hit.
pub fn theme_weight(theme: &Theme, prompt_lower: &str) -> u32 {
    let hits = theme
        .keywords
        .iter()
        .filter(|k| prompt_lower.contains(*k))
        .count() as u32;
    1 + 3 * hits
}

/// Pick a canned line for `prompt` using `rng`.
pub fn pick_line<R: Rng + ?Sized>(prompt: &str, mode: GenerationMode, rng: &mut R) -> &'static str {
    let prompt_lower = prompt.to_lowercase();
    let weights: Vec<u32> = THEMES.iter().map(|t| theme_weight(t, &prompt_lower)).collect();
    let total: u32 = weights.iter().sum();

    let mut roll = rng.random_range(0..total);
    let mut chosen = &THEMES[THEMES.len() - 1];
    for (theme, weight) in THEMES.iter().zip(&weights) {
        if roll < *weight {
            chosen = theme;
            break;
        }
        roll -= weight;
    }

    let lines = match mode {
        GenerationMode::Tweet => chosen.tweets,
        GenerationMode::Fact => chosen.facts,
    };
    lines[rng.random_range(0..lines.len())]
}

/// Engine that never fails.
#[derive(Debug, Clone, Default)]
pub struct FallbackEngine;

#[async_trait]
impl TextEngine for FallbackEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Fallback
    }

    async fn generate(&self, request: &EngineRequest) -> EngineOutcome {
        let line = pick_line(&request.prompt, request.mode, &mut rand::rng());
        EngineOutcome::Text(line.to_string())
    }
}
