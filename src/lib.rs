//! # stoabot
//!
//! One-shot social content bot. Each invocation runs one operation to
//! completion: generate text through an ordered fallback chain of engines,
//! rotate quotes from a persistent store, escalate single fact posts into a
//! thread on a fixed cadence, or render a quote onto an image card.
//!
//! Cross-invocation state (recent posts, cadence counter, quote store) lives
//! in small JSON files guarded by co-located lock files.

pub mod cli;
pub mod flow;
pub mod imaging;
pub mod llms;
pub mod quotes;
pub mod social;
pub mod sources;
pub mod state;
pub mod utilities;

pub use flow::{BotContext, FlowOutcome, HealthReport};
pub use llms::{EngineSelection, Generation, GenerationChain, TextEngine};
pub use quotes::{QuoteRecord, QuoteStore};
pub use social::{Poster, TwitterClient};
pub use utilities::config::AppConfig;
pub use utilities::errors::{BotError, Result};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
