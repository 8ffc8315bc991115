//! Quote store: deduplicated source material with cooldown-aware rotation.
//!
//! The store exclusively owns its [`QuoteRecord`]s. Callers get clones back
//! and report a post through [`QuoteStore::mark_posted`].

pub mod record;
pub mod store;

pub use record::{IngestReport, QuoteCandidate, QuoteRecord};
pub use store::QuoteStore;
