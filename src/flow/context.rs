//! Collaborators shared by every recipe.

use std::sync::Arc;

use crate::imaging::{BackgroundGenerator, CardComposer};
use crate::llms::GenerationChain;
use crate::quotes::QuoteStore;
use crate::social::{Poster, TwitterClient};
use crate::sources::{rotating_sources, QuoteSource, StoicQuoteSource};
use crate::state::{CadenceCounter, RecencyTracker};
use crate::utilities::config::AppConfig;
use crate::utilities::printer::Printer;

/// Everything a recipe needs, built once per invocation.
pub struct BotContext {
    pub config: AppConfig,
    pub printer: Printer,
    pub chain: GenerationChain,
    pub poster: Arc<dyn Poster>,
    pub quotes: QuoteStore,
    pub recent: RecencyTracker,
    pub cadence: CadenceCounter,
    pub stoic: Box<dyn QuoteSource>,
    pub sources: Vec<Box<dyn QuoteSource>>,
    pub composer: CardComposer,
    pub backgrounds: BackgroundGenerator,
}

impl BotContext {
    pub fn from_config(config: AppConfig, printer: Printer) -> Self {
        let chain = GenerationChain::from_config(&config);
        let poster: Arc<dyn Poster> = Arc::new(TwitterClient::from_config(&config, printer.clone()));
        let quotes = QuoteStore::new(config.quotes_store_path.clone());
        let recent = RecencyTracker::new(config.recent_posts_path());
        let cadence = CadenceCounter::new(config.cadence_path(), config.thread_every);
        let backgrounds = BackgroundGenerator::from_config(&config);

        Self {
            config,
            printer,
            chain,
            poster,
            quotes,
            recent,
            cadence,
            stoic: Box::new(StoicQuoteSource::default()),
            sources: rotating_sources(),
            composer: CardComposer::default(),
            backgrounds,
        }
    }

    pub fn with_poster(mut self, poster: Arc<dyn Poster>) -> Self {
        self.poster = poster;
        self
    }

    pub fn with_chain(mut self, chain: GenerationChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_sources(mut self, stoic: Box<dyn QuoteSource>, sources: Vec<Box<dyn QuoteSource>>) -> Self {
        self.stoic = stoic;
        self.sources = sources;
        self
    }

    pub fn with_backgrounds(mut self, backgrounds: BackgroundGenerator) -> Self {
        self.backgrounds = backgrounds;
        self
    }

    pub fn with_composer(mut self, composer: CardComposer) -> Self {
        self.composer = composer;
        self
    }

    /// `--dry-run/--no-dry-run` over the configured default.
    pub fn dry_run(&self, flag: Option<bool>) -> bool {
        flag.unwrap_or(self.config.dry_run_default)
    }
}
