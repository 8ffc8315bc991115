//! Network-backed text engines.
//!
//! | Engine | Module | Endpoint |
//! |--------|--------|----------|
//! | Hosted provider | [`openai`] | `POST {base}/chat/completions` |
//! | Ollama | [`ollama`] | `POST {host}/api/chat`, then `/api/generate` |
//! | Small model | [`huggingface`] | Hugging Face text-generation inference |
//!
//! The [`utils`] module holds the shared HTTP status handling.

pub mod huggingface;
pub mod ollama;
pub mod openai;
pub mod utils;

pub use huggingface::HuggingFaceEngine;
pub use ollama::OllamaEngine;
pub use openai::ProviderEngine;
