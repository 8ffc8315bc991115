//! Persistent quote store.
//!
//! Backing format is a pretty-printed JSON array of [`QuoteRecord`]s. Reads
//! are served from memory after the first access. Every write re-reads the
//! file under the store's lock, applies the change and rewrites it in full
//! through [`write_atomic`], so concurrent runs never drop each other's
//! records.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde_json::Value;
use uuid::Uuid;

use super::record::{IngestReport, QuoteCandidate, QuoteRecord};
use crate::utilities::errors::{BotError, Result};
use crate::utilities::file_handler::{write_atomic, StateLock};
use crate::utilities::string_utils::normalize_key;

/// Durable, deduplicated quote collection.
#[derive(Debug)]
pub struct QuoteStore {
    path: PathBuf,
    records: Vec<QuoteRecord>,
    /// normalized text -> index into `records`
    by_key: HashMap<String, usize>,
    loaded: bool,
}

impl QuoteStore {
    /// Create a store backed by `path`. The file is not read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
            by_key: HashMap::new(),
            loaded: false,
        }
    }

    /// Backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records currently on disk, blank entries dropped.
    fn read_disk(&self) -> Result<Vec<QuoteRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<QuoteRecord> = serde_json::from_str(&content)?;
        Ok(records
            .into_iter()
            .filter(|r| !r.text.trim().is_empty())
            .collect())
    }

    fn install(&mut self, records: Vec<QuoteRecord>) {
        self.by_key = index_by_key(&records);
        self.records = records;
        self.loaded = true;
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        let records = self.read_disk()?;
        log::debug!("Loaded {} quotes from {}", records.len(), self.path.display());
        self.install(records);
        Ok(())
    }

    fn persist(&self, records: &[QuoteRecord]) -> Result<()> {
        let content = serde_json::to_string_pretty(records)?;
        write_atomic(&self.path, content.as_bytes())
    }

    /// Locked read-modify-write of the backing file.
    ///
    /// The store lock is held across the re-read, `mutate` and the write, so
    /// concurrent runs each see the other's changes. `mutate` works on a
    /// fresh copy of the disk state; memory is replaced only once the write
    /// has succeeded. Nothing is written when `mutate` reports no change.
    fn write_cycle<R, F>(&mut self, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<QuoteRecord>, &mut HashMap<String, usize>) -> Result<(R, bool)>,
    {
        let _lock = StateLock::acquire(&self.path)?;
        let mut records = self.read_disk()?;
        let mut by_key = index_by_key(&records);
        let (result, changed) = mutate(&mut records, &mut by_key)?;
        if changed {
            self.persist(&records)?;
        }
        self.install(records);
        Ok(result)
    }

    /// Number of stored records.
    pub fn count(&mut self) -> Result<usize> {
        self.ensure_loaded()?;
        Ok(self.records.len())
    }

    /// All stored records, in insertion order.
    pub fn records(&mut self) -> Result<&[QuoteRecord]> {
        self.ensure_loaded()?;
        Ok(&self.records)
    }

    /// Add every candidate whose normalized text is not already stored.
    pub fn ingest(&mut self, candidates: &[QuoteCandidate], source: &str) -> Result<IngestReport> {
        self.ingest_at(candidates, source, Utc::now())
    }

    fn ingest_at(
        &mut self,
        candidates: &[QuoteCandidate],
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<IngestReport> {
        let report = self.write_cycle(|records, by_key| {
            let mut report = IngestReport::default();
            for candidate in candidates {
                let text = candidate.text.trim();
                if text.is_empty() {
                    continue;
                }
                let key = normalize_key(text);
                if by_key.contains_key(&key) {
                    report.duplicates += 1;
                    continue;
                }
                let record = QuoteRecord {
                    id: Uuid::new_v4().to_string(),
                    text: text.to_string(),
                    author: candidate
                        .author
                        .as_deref()
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(String::from),
                    source: source.to_string(),
                    added_at: now,
                    last_posted_at: None,
                    times_posted: 0,
                };
                by_key.insert(key, records.len());
                records.push(record);
                report.added += 1;
            }
            let changed = report.added > 0;
            Ok((report, changed))
        })?;
        log::info!(
            "Ingested from {}: added={}, duplicates={}",
            source,
            report.added,
            report.duplicates
        );
        Ok(report)
    }

    /// Ingest a quote file.
    ///
    /// `.json` files hold an array of strings or `{text|quote, author}`
    /// objects; anything else is read as one quote per line. The source
    /// label defaults to the file name.
    pub fn ingest_file(&mut self, path: &Path, source: Option<&str>) -> Result<IngestReport> {
        let content = fs::read_to_string(path)?;
        let candidates = parse_quote_file(path, &content)?;
        let label = match source {
            Some(s) => s.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "file".to_string()),
        };
        self.ingest(&candidates, &label)
    }

    /// Choose the next quote to post.
    ///
    /// Uniform among records never posted or posted more than
    /// `cooldown_days` ago; when everything is cooling down, the record with
    /// the oldest `last_posted_at`; `None` for an empty store.
    pub fn pick_for_post(&mut self, cooldown_days: i64) -> Result<Option<QuoteRecord>> {
        let mut rng = rand::rng();
        self.pick_for_post_with(cooldown_days, Utc::now(), &mut rng)
    }

    /// [`pick_for_post`](Self::pick_for_post) with an explicit clock and RNG.
    pub fn pick_for_post_with<R: Rng + ?Sized>(
        &mut self,
        cooldown_days: i64,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Option<QuoteRecord>> {
        self.ensure_loaded()?;
        if self.records.is_empty() {
            return Ok(None);
        }
        let cutoff = now - Duration::days(cooldown_days.max(0));
        let eligible: Vec<&QuoteRecord> = self
            .records
            .iter()
            .filter(|r| match r.last_posted_at {
                None => true,
                Some(last) => last <= cutoff,
            })
            .collect();

        if let Some(choice) = eligible.choose(rng) {
            return Ok(Some((*choice).clone()));
        }

        // Everything is cooling down: least recently posted wins. `None`
        // sorts first, so never-posted records would be preferred here.
        let oldest = self.records.iter().min_by_key(|r| r.last_posted_at).cloned();
        log::debug!("All quotes within cooldown; falling back to least recently posted");
        Ok(oldest)
    }

    /// Record that `record` was posted now and persist the store.
    pub fn mark_posted(&mut self, record: &QuoteRecord) -> Result<QuoteRecord> {
        self.mark_posted_at(record, Utc::now())
    }

    /// [`mark_posted`](Self::mark_posted) with an explicit clock.
    pub fn mark_posted_at(
        &mut self,
        record: &QuoteRecord,
        now: DateTime<Utc>,
    ) -> Result<QuoteRecord> {
        self.write_cycle(|records, by_key| {
            let idx = records
                .iter()
                .position(|r| r.id == record.id)
                .or_else(|| by_key.get(&normalize_key(&record.text)).copied())
                .ok_or_else(|| BotError::UnknownQuote(record.id.clone()))?;

            let stored = &mut records[idx];
            stored.last_posted_at = Some(now);
            stored.times_posted = stored.times_posted.saturating_add(1);
            Ok((stored.clone(), true))
        })
    }
}

/// normalized text -> first index holding it
fn index_by_key(records: &[QuoteRecord]) -> HashMap<String, usize> {
    let mut by_key = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        by_key.entry(normalize_key(&record.text)).or_insert(idx);
    }
    by_key
}

/// Parse quote candidates from a file's content.
pub fn parse_quote_file(path: &Path, content: &str) -> Result<Vec<QuoteCandidate>> {
    let is_json = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let value: Value = serde_json::from_str(content)?;
        let items = value
            .as_array()
            .ok_or_else(|| BotError::malformed(path.display().to_string(), "expected a JSON array"))?;
        let candidates = items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(QuoteCandidate::new(s.as_str())),
                Value::Object(obj) => {
                    let text = obj
                        .get("text")
                        .or_else(|| obj.get("quote"))
                        .and_then(Value::as_str)?;
                    let author = obj.get("author").and_then(Value::as_str).map(String::from);
                    Some(QuoteCandidate::with_author(text, author))
                }
                _ => None,
            })
            .collect();
        return Ok(candidates);
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let unquoted = line
                .strip_prefix('"')
                .and_then(|l| l.strip_suffix('"'))
                .unwrap_or(line);
            QuoteCandidate::new(unquoted.replace("\"\"", "\""))
        })
        .collect())
}
