//! Orchestration of the bot's named operations.
//!
//! - [`context`] - The collaborators a run needs, built once
//! - [`recipes`] - `generate`, `post`, `post-fact`, quote and image posts, ingest, health
//! - [`thread`] - Fact collection and formatting for cadence threads
//! - [`outcome`] - What each operation did

pub mod context;
pub mod outcome;
pub mod recipes;
pub mod thread;

pub use self::context::BotContext;
pub use self::outcome::{FlowOutcome, HealthReport};
pub use self::recipes::{prepare_text, ImageOptions};
