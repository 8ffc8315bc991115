//! File handling for persisted bot state.
//!
//! Two primitives: [`write_atomic`] (uniquely named temp file + rename, so a
//! crash never leaves a half-written store behind) and [`LockedJsonFile`],
//! which wraps a small JSON blob in an exclusive, co-located lock file for
//! the whole read-modify-write cycle.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::utilities::errors::{BotError, Result};

/// Append `suffix` to the full file name (`state.json` -> `state.json.lock`).
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write `contents` to `path` via a synced temporary sibling and a rename.
///
/// Each call gets its own temp file, so concurrent writers never share one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Exclusive lock held on `<file>.lock`; released on drop.
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    /// Block until the lock for `target` is acquired.
    pub fn acquire(target: &Path) -> Result<Self> {
        ensure_parent(target)?;
        let path = sibling_with_suffix(target, ".lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        file.lock().map_err(|e| BotError::Lock {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::debug!("Acquired state lock {}", path.display());
        Ok(Self { file, path })
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            log::warn!("Failed to release state lock {}: {}", self.path.display(), e);
        }
    }
}

/// A JSON document guarded by a co-located lock file.
#[derive(Debug, Clone)]
pub struct LockedJsonFile {
    path: PathBuf,
}

impl LockedJsonFile {
    /// Create a handle for the JSON file at `path`. Nothing is touched yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the JSON document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_or_default<T: DeserializeOwned + Default>(&self) -> Result<T> {
        if !self.path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        match serde_json::from_str(&content) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::warn!(
                    "Unreadable state file {} ({}); starting from defaults",
                    self.path.display(),
                    e
                );
                Ok(T::default())
            }
        }
    }

    /// Read the current value under the lock.
    pub fn load<T: DeserializeOwned + Default>(&self) -> Result<T> {
        let _lock = StateLock::acquire(&self.path)?;
        self.read_or_default()
    }

    /// Locked read-or-default, mutate, atomic write.
    ///
    /// The lock is held from before the read until after the rename.
    pub fn update<T, R, F>(&self, mutate: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> R,
    {
        let _lock = StateLock::acquire(&self.path)?;
        let mut value: T = self.read_or_default()?;
        let result = mutate(&mut value);
        let content = serde_json::to_string_pretty(&value)?;
        write_atomic(&self.path, content.as_bytes())?;
        Ok(result)
    }
}
