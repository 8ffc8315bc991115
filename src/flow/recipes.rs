//! The named operations behind the CLI subcommands.
//!
//! Every recipe follows the same shape: obtain text, sanitize it, truncate
//! it, then (unless dry-running) hand it to the poster. Persistent state is
//! touched only after the poster reports success. Failures become status
//! lines and a [`FlowOutcome::Skipped`]; the only recipe that returns an
//! error is [`BotContext::ingest`], for unreadable input files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::flow::context::BotContext;
use crate::flow::outcome::{FlowOutcome, HealthReport};
use crate::flow::thread::{collect_thread_facts, thread_texts};
use crate::imaging::{build_background_prompt, CardStyle};
use crate::llms::{EngineSelection, GenerationMode};
use crate::quotes::{IngestReport, QuoteRecord};
use crate::sources::fetch_rotating;
use crate::state::{CadenceAction, RecentPosts};
use crate::utilities::errors::Result;
use crate::utilities::printer::Status;
use crate::utilities::prompts::fact_prompt;
use crate::utilities::string_utils::{sanitize_ascii, truncate_chars};

/// Extra generations allowed when the text was posted recently.
pub const MAX_REGENERATIONS: usize = 3;

/// Filename sent with card uploads.
const IMAGE_FILENAME: &str = "quote.jpg";

/// ASCII-only, trimmed, clamped to `limit`.
pub fn prepare_text(text: &str, limit: i64) -> String {
    truncate_chars(sanitize_ascii(text).trim(), limit)
        .trim_end()
        .to_string()
}

/// Options of `post-quote-image`.
#[derive(Debug, Clone, Default)]
pub struct ImageOptions {
    pub style: CardStyle,
    /// Local background image; AI generation is skipped when set.
    pub background: Option<PathBuf>,
    /// Also write the rendered JPEG here.
    pub save: Option<PathBuf>,
    /// Engine used to write the background prompt.
    pub engine: EngineSelection,
}

impl BotContext {
    // ---------------------------------------------------------------------
    // Shared steps
    // ---------------------------------------------------------------------

    fn is_recent(&self, text: &str) -> bool {
        self.recent.is_recent(text).unwrap_or_else(|e| {
            log::warn!("Could not read recent posts: {}", e);
            false
        })
    }

    fn remember<I>(&self, texts: I)
    where
        I: IntoIterator<Item = String>,
    {
        if let Err(e) = self.recent.record(texts) {
            log::error!("Failed to record recent posts: {}", e);
            self.printer
                .status(Status::Error, &format!("Posted, but recent list not updated: {}", e));
        }
    }

    fn mark_quote(&mut self, record: &QuoteRecord) {
        match self.quotes.mark_posted(record) {
            Ok(updated) => log::info!("Quote {} posted {} times", updated.id, updated.times_posted),
            Err(e) => {
                log::error!("Failed to mark quote {} as posted: {}", record.id, e);
                self.printer
                    .status(Status::Error, &format!("Posted, but quote store not updated: {}", e));
            }
        }
    }

    /// Print, then post unless dry-running. Records the text as recent on
    /// success.
    async fn publish(&self, text: &str, dry_run: bool) -> FlowOutcome {
        if text.trim().is_empty() {
            self.printer
                .status(Status::Error, "Empty tweet text; skipping post.");
            return FlowOutcome::skipped("empty text");
        }
        self.printer.text(text);

        if dry_run {
            self.printer.status(Status::DryRun, "Skipping post.");
            return FlowOutcome::DryRun {
                texts: vec![text.to_string()],
            };
        }

        match self.poster.post_tweet(text).await {
            Some(id) => {
                self.remember([text.to_string()]);
                self.printer
                    .status(Status::Ok, &format!("Posted tweet id: {}", id));
                FlowOutcome::Posted {
                    text: text.to_string(),
                    id,
                }
            }
            None => {
                self.printer
                    .status(Status::Skip, "No post (rate-limited or error).");
                FlowOutcome::skipped("post failed")
            }
        }
    }

    /// Generate text not seen in the recent list, regenerating up to
    /// [`MAX_REGENERATIONS`] times.
    async fn fresh_generation(
        &self,
        prompt: &str,
        selection: EngineSelection,
        mode: GenerationMode,
    ) -> std::result::Result<String, FlowOutcome> {
        for attempt in 0..=MAX_REGENERATIONS {
            let generation = self.chain.generate(prompt, selection, mode).await;
            let text = prepare_text(&generation.text, self.config.max_length);
            if text.is_empty() {
                self.printer
                    .status(Status::Error, "Empty generation result; not posting.");
                return Err(FlowOutcome::skipped("empty generation"));
            }
            if !self.is_recent(&text) {
                return Ok(text);
            }
            log::info!(
                "Generated text was posted recently ({}/{}), regenerating",
                attempt + 1,
                MAX_REGENERATIONS + 1
            );
        }
        self.printer
            .status(Status::Skip, "Generated text matches a recent post; not posting.");
        Err(FlowOutcome::skipped("duplicate"))
    }

    // ---------------------------------------------------------------------
    // Text recipes
    // ---------------------------------------------------------------------

    /// Generate and print; nothing is posted or recorded.
    pub async fn generate(
        &self,
        prompt: &str,
        selection: EngineSelection,
        max_length: Option<i64>,
    ) -> FlowOutcome {
        let limit = max_length.unwrap_or(self.config.max_length);
        let chain = self.chain.with_max_length(limit);
        let generation = chain.generate(prompt, selection, GenerationMode::Tweet).await;
        let text = prepare_text(&generation.text, limit);
        self.printer.text(&text);
        FlowOutcome::Generated {
            text,
            engine: generation.engine,
        }
    }

    /// Generate from `prompt` and post.
    pub async fn post(&self, prompt: &str, selection: EngineSelection, dry_run: bool) -> FlowOutcome {
        match self
            .fresh_generation(prompt, selection, GenerationMode::Tweet)
            .await
        {
            Ok(text) => self.publish(&text, dry_run).await,
            Err(outcome) => outcome,
        }
    }

    /// Post `text` as given, after sanitizing and truncating.
    pub async fn post_text(&self, text: &str, dry_run: bool) -> FlowOutcome {
        let text = prepare_text(text, self.config.max_length);
        self.publish(&text, dry_run).await
    }

    /// One fact, or a thread when the cadence says so (or `force_thread`).
    pub async fn post_fact(
        &self,
        subject: Option<&str>,
        force_thread: bool,
        selection: EngineSelection,
        dry_run: bool,
    ) -> FlowOutcome {
        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.config.fact_subject.as_str())
            .to_string();

        let action = if force_thread {
            CadenceAction::Thread
        } else {
            self.cadence.next_action().unwrap_or_else(|e| {
                log::warn!("Could not read cadence state, posting a single fact: {}", e);
                CadenceAction::Single
            })
        };

        match action {
            CadenceAction::Single => self.post_single_fact(&subject, selection, dry_run).await,
            CadenceAction::Thread => self.post_fact_thread(&subject, selection, dry_run).await,
        }
    }

    async fn post_single_fact(
        &self,
        subject: &str,
        selection: EngineSelection,
        dry_run: bool,
    ) -> FlowOutcome {
        let text = match self
            .fresh_generation(&fact_prompt(subject), selection, GenerationMode::Fact)
            .await
        {
            Ok(text) => text,
            Err(outcome) => return outcome,
        };

        let outcome = self.publish(&text, dry_run).await;
        if outcome.is_posted() {
            match self.cadence.record_single() {
                Ok(count) => log::info!(
                    "{} of {} single posts before the next thread",
                    count,
                    self.cadence.threshold()
                ),
                Err(e) => {
                    log::error!("Failed to update cadence: {}", e);
                    self.printer
                        .status(Status::Error, &format!("Posted, but cadence not updated: {}", e));
                }
            }
        }
        outcome
    }

    async fn post_fact_thread(
        &self,
        subject: &str,
        selection: EngineSelection,
        dry_run: bool,
    ) -> FlowOutcome {
        let recent = self.recent.load().unwrap_or_else(|e| {
            log::warn!("Could not read recent posts: {}", e);
            RecentPosts::default()
        });
        let facts = collect_thread_facts(&self.chain, subject, selection, &recent).await;
        if facts.is_empty() {
            self.printer
                .status(Status::Skip, "No unique facts collected; not posting thread.");
            return FlowOutcome::skipped("no facts");
        }

        let texts = thread_texts(subject, &facts, self.config.max_length);
        for text in &texts {
            self.printer.text(text);
        }
        if dry_run {
            self.printer.status(
                Status::DryRun,
                &format!("Skipping thread of {} posts.", texts.len()),
            );
            return FlowOutcome::DryRun { texts };
        }

        let ids = self.poster.post_thread(&texts).await;
        if ids.is_empty() {
            self.printer
                .status(Status::Skip, "No thread posted (rate-limited or error).");
            return FlowOutcome::skipped("thread failed");
        }

        // ids[0] belongs to the header; each further id is one fact.
        let posted_facts = ids.len().saturating_sub(1).min(facts.len());
        if posted_facts == 0 {
            self.printer.status(
                Status::Skip,
                &format!(
                    "Thread stopped after its header (id {}); cadence not reset.",
                    ids[0]
                ),
            );
            return FlowOutcome::skipped("thread incomplete");
        }
        self.remember(facts.into_iter().take(posted_facts));
        if let Err(e) = self.cadence.record_thread() {
            log::error!("Failed to reset cadence: {}", e);
            self.printer
                .status(Status::Error, &format!("Posted, but cadence not reset: {}", e));
        }
        if ids.len() < texts.len() {
            self.printer.status(
                Status::Skip,
                &format!("Thread stopped after {} of {} posts.", ids.len(), texts.len()),
            );
        }
        self.printer.status(
            Status::Ok,
            &format!("Posted thread of {} (first id {}).", ids.len(), ids[0]),
        );
        FlowOutcome::ThreadPosted { texts, ids }
    }

    // ---------------------------------------------------------------------
    // Quote recipes
    // ---------------------------------------------------------------------

    /// A quote from the Stoic quote API, attributed.
    pub async fn post_stoic(&self, dry_run: bool) -> FlowOutcome {
        let Some(candidate) = self.stoic.fetch().await else {
            self.printer
                .status(Status::Error, "Failed to fetch stoic quote.");
            return FlowOutcome::skipped("stoic quote unavailable");
        };
        let text = prepare_text(&candidate.display_text(), self.config.max_length);
        if self.is_recent(&text) {
            self.printer
                .status(Status::Skip, "Quote was posted recently; not posting.");
            return FlowOutcome::skipped("duplicate");
        }
        self.publish(&text, dry_run).await
    }

    /// Next quote from the store, seeding the store from the rotating
    /// sources when it is empty.
    async fn next_quote(&mut self, cooldown_days: i64) -> std::result::Result<QuoteRecord, FlowOutcome> {
        match self.quotes.pick_for_post(cooldown_days) {
            Ok(Some(record)) => return Ok(record),
            Ok(None) => log::info!("Quote store is empty, fetching one"),
            Err(e) => {
                self.printer
                    .status(Status::Error, &format!("Quote store unavailable: {}", e));
                return Err(FlowOutcome::skipped("store unavailable"));
            }
        }

        let Some((candidate, source)) = fetch_rotating(&self.sources).await else {
            self.printer
                .status(Status::Error, "Quote store is empty and no quote source answered.");
            return Err(FlowOutcome::skipped("no quote"));
        };
        if let Err(e) = self.quotes.ingest(&[candidate], source) {
            self.printer
                .status(Status::Error, &format!("Could not store fetched quote: {}", e));
            return Err(FlowOutcome::skipped("store unavailable"));
        }
        match self.quotes.pick_for_post(cooldown_days) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(FlowOutcome::skipped("no quote")),
            Err(e) => {
                self.printer
                    .status(Status::Error, &format!("Quote store unavailable: {}", e));
                Err(FlowOutcome::skipped("store unavailable"))
            }
        }
    }

    /// Post a stored quote as text.
    pub async fn post_quote(&mut self, cooldown_days: Option<i64>, dry_run: bool) -> FlowOutcome {
        let cooldown = cooldown_days.unwrap_or(self.config.quote_cooldown_days);
        let record = match self.next_quote(cooldown).await {
            Ok(record) => record,
            Err(outcome) => return outcome,
        };
        let text = prepare_text(&record.display_text(), self.config.max_length);
        let outcome = self.publish(&text, dry_run).await;
        if outcome.is_posted() {
            self.mark_quote(&record);
        }
        outcome
    }

    /// Post a stored quote rendered onto a card image.
    pub async fn post_quote_image(
        &mut self,
        cooldown_days: Option<i64>,
        options: &ImageOptions,
        dry_run: bool,
    ) -> FlowOutcome {
        let cooldown = cooldown_days.unwrap_or(self.config.quote_cooldown_days);
        let record = match self.next_quote(cooldown).await {
            Ok(record) => record,
            Err(outcome) => return outcome,
        };
        let text = prepare_text(&record.display_text(), self.config.max_length);
        if text.is_empty() {
            self.printer
                .status(Status::Error, "Empty tweet text; skipping post.");
            return FlowOutcome::skipped("empty text");
        }

        let background = self.background_for(&text, options).await;
        let image = match self
            .composer
            .compose_style(&text, background.as_deref(), options.style)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                self.printer
                    .status(Status::Error, &format!("Image composition failed: {}", e));
                return FlowOutcome::skipped("image failed");
            }
        };

        if let Some(path) = &options.save {
            match fs::write(path, &image) {
                Ok(()) => self
                    .printer
                    .status(Status::Info, &format!("Saved image to {}", path.display())),
                Err(e) => self.printer.status(
                    Status::Error,
                    &format!("Could not save image to {}: {}", path.display(), e),
                ),
            }
        }

        self.printer.text(&text);
        if dry_run {
            self.printer.status(
                Status::DryRun,
                &format!("Skipping post ({} byte image).", image.len()),
            );
            return FlowOutcome::DryRun { texts: vec![text] };
        }

        match self
            .poster
            .upload_media_and_post(&text, &image, IMAGE_FILENAME)
            .await
        {
            Some(id) => {
                self.remember([text.clone()]);
                self.mark_quote(&record);
                self.printer
                    .status(Status::Ok, &format!("Posted tweet id: {}", id));
                FlowOutcome::Posted { text, id }
            }
            None => {
                self.printer
                    .status(Status::Skip, "No post (rate-limited or error).");
                FlowOutcome::skipped("post failed")
            }
        }
    }

    /// Background bytes for a card: the given file, else an AI image for
    /// the photo styles, else nothing (the composer picks its own).
    async fn background_for(&self, text: &str, options: &ImageOptions) -> Option<Vec<u8>> {
        if let Some(path) = &options.background {
            return match fs::read(path) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    log::warn!("Could not read background {}: {}", path.display(), e);
                    None
                }
            };
        }
        if options.style == CardStyle::Gradient {
            return None;
        }
        let prompt = build_background_prompt(&self.chain, text, options.engine).await;
        log::info!("Background prompt: {}", prompt);
        self.backgrounds.generate(&prompt).await
    }

    // ---------------------------------------------------------------------
    // Maintenance
    // ---------------------------------------------------------------------

    /// Add quotes from `path` and/or `fetch` rotating-source lookups.
    pub async fn ingest(
        &mut self,
        path: Option<&Path>,
        source: Option<&str>,
        fetch: usize,
    ) -> Result<IngestReport> {
        let mut total = IngestReport::default();

        if let Some(path) = path {
            let report = self.quotes.ingest_file(path, source)?;
            total.added += report.added;
            total.duplicates += report.duplicates;
        }

        for _ in 0..fetch {
            match fetch_rotating(&self.sources).await {
                Some((candidate, name)) => {
                    let report = self.quotes.ingest(&[candidate], source.unwrap_or(name))?;
                    total.added += report.added;
                    total.duplicates += report.duplicates;
                }
                None => self
                    .printer
                    .status(Status::Skip, "No quote source answered."),
            }
        }

        let count = self.quotes.count()?;
        self.printer.status(
            Status::Ok,
            &format!(
                "Ingested: added={}, duplicates={}, total={}",
                total.added, total.duplicates, count
            ),
        );
        Ok(total)
    }

    /// Report missing credentials and which capabilities are available.
    pub fn health(&mut self) -> HealthReport {
        let quote_count = self.quotes.count().unwrap_or_else(|e| {
            log::warn!("Could not read quote store: {}", e);
            0
        });
        let report = HealthReport {
            missing_credentials: self
                .config
                .twitter
                .missing()
                .into_iter()
                .map(String::from)
                .collect(),
            engines: self.chain.configured(),
            image_backends: self
                .backgrounds
                .names()
                .into_iter()
                .map(String::from)
                .collect(),
            quote_count,
            dry_run_default: self.config.dry_run_default,
        };

        let engines: Vec<&str> = report.engines.iter().map(|e| e.as_str()).collect();
        self.printer.text(&report.config_line());
        self.printer.text(&format!("engines: {}", engines.join(", ")));
        self.printer
            .text(&format!("images: {}", report.image_backends.join(", ")));
        self.printer.text(&format!("quotes: {}", report.quote_count));
        self.printer
            .text(&format!("dry-run default: {}", report.dry_run_default));
        report
    }
}
