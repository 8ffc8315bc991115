//! Text generation.
//!
//! - [`engine`] - The [`TextEngine`] trait and request/outcome types
//! - [`providers`] - Network engines (hosted provider, Ollama, Hugging Face)
//! - [`fallback`] - Canned-line engine that always answers
//! - [`normalize`] - Cleanup applied to every engine output
//! - [`chain`] - Ordered fallback across engines with truncation

pub mod chain;
pub mod engine;
pub mod fallback;
pub mod normalize;
pub mod providers;

// Re-exports for convenience
pub use chain::{Generation, GenerationChain};
pub use engine::{
    EngineKind, EngineOutcome, EngineRequest, EngineSelection, GenerationMode, TextEngine,
};
pub use fallback::FallbackEngine;
