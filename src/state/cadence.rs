//! Thread cadence: single posts until a threshold, then one thread.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utilities::errors::Result;
use crate::utilities::file_handler::LockedJsonFile;

/// Persisted counter of single posts since the last thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceState {
    #[serde(default)]
    pub posts_since_thread: u32,
}

/// What the next fact post should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceAction {
    Single,
    Thread,
}

impl CadenceAction {
    /// `Thread` once `count` has reached `threshold`.
    pub fn decide(count: u32, threshold: u32) -> Self {
        if count >= threshold.max(1) {
            Self::Thread
        } else {
            Self::Single
        }
    }
}

/// File-backed cadence counter.
#[derive(Debug, Clone)]
pub struct CadenceCounter {
    file: LockedJsonFile,
    threshold: u32,
}

impl CadenceCounter {
    pub fn new(path: impl Into<PathBuf>, threshold: u32) -> Self {
        Self {
            file: LockedJsonFile::new(path),
            threshold,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Current persisted count.
    pub fn current(&self) -> Result<u32> {
        let state: CadenceState = self.file.load()?;
        Ok(state.posts_since_thread)
    }

    /// Decide from the persisted count.
    pub fn next_action(&self) -> Result<CadenceAction> {
        Ok(CadenceAction::decide(self.current()?, self.threshold))
    }

    /// A single post went out: +1.
    pub fn record_single(&self) -> Result<u32> {
        self.file.update(|state: &mut CadenceState| {
            state.posts_since_thread = state.posts_since_thread.saturating_add(1);
            state.posts_since_thread
        })
    }

    /// A thread went out: back to 0.
    pub fn record_thread(&self) -> Result<()> {
        self.file.update(|state: &mut CadenceState| {
            state.posts_since_thread = 0;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide() {
        assert_eq!(CadenceAction::decide(0, 15), CadenceAction::Single);
        assert_eq!(CadenceAction::decide(14, 15), CadenceAction::Single);
        assert_eq!(CadenceAction::decide(15, 15), CadenceAction::Thread);
        assert_eq!(CadenceAction::decide(20, 15), CadenceAction::Thread);
        // A zero threshold behaves like 1 rather than threading every time.
        assert_eq!(CadenceAction::decide(0, 0), CadenceAction::Single);
    }

    #[test]
    fn test_counter_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let counter = CadenceCounter::new(dir.path().join("cadence.json"), 15);
        assert_eq!(counter.current().unwrap(), 0);

        for expected in 1..=15 {
            assert_eq!(counter.next_action().unwrap(), CadenceAction::Single);
            assert_eq!(counter.record_single().unwrap(), expected);
        }
        assert_eq!(counter.next_action().unwrap(), CadenceAction::Thread);

        counter.record_thread().unwrap();
        assert_eq!(counter.current().unwrap(), 0);
        assert_eq!(counter.next_action().unwrap(), CadenceAction::Single);
    }

    #[test]
    fn test_counter_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence.json");
        std::fs::write(&path, r#"{"posts_since_thread": 9}"#).unwrap();
        let counter = CadenceCounter::new(&path, 10);
        assert_eq!(counter.record_single().unwrap(), 10);
        assert_eq!(counter.next_action().unwrap(), CadenceAction::Thread);
    }
}
