//! Recently posted texts.

use std::collections::VecDeque;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utilities::errors::Result;
use crate::utilities::file_handler::LockedJsonFile;

/// Maximum number of remembered posts.
pub const RECENT_CAPACITY: usize = 200;

/// How many of the newest entries a duplicate check looks at.
pub const RECENT_CHECK_WINDOW: usize = 500;

/// Bounded FIFO of posted texts, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentPosts {
    #[serde(default)]
    pub recent: VecDeque<String>,
}

impl RecentPosts {
    /// Append and evict from the front down to [`RECENT_CAPACITY`].
    pub fn push(&mut self, text: impl Into<String>) {
        self.recent.push_back(text.into());
        while self.recent.len() > RECENT_CAPACITY {
            self.recent.pop_front();
        }
    }

    /// Exact-match lookup among the newest [`RECENT_CHECK_WINDOW`] entries.
    pub fn contains(&self, text: &str) -> bool {
        self.recent
            .iter()
            .rev()
            .take(RECENT_CHECK_WINDOW)
            .any(|t| t == text)
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}

/// File-backed access to [`RecentPosts`].
#[derive(Debug, Clone)]
pub struct RecencyTracker {
    file: LockedJsonFile,
}

impl RecencyTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: LockedJsonFile::new(path),
        }
    }

    /// Snapshot of the persisted list.
    pub fn load(&self) -> Result<RecentPosts> {
        self.file.load()
    }

    /// Whether `text` was posted recently.
    pub fn is_recent(&self, text: &str) -> Result<bool> {
        Ok(self.load()?.contains(text))
    }

    /// Record successfully posted texts, in order.
    pub fn record<I, S>(&self, texts: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file.update(|posts: &mut RecentPosts| {
            for text in texts {
                posts.push(text);
            }
            posts.len()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_caps_and_evicts_oldest() {
        let mut posts = RecentPosts::default();
        for i in 0..(RECENT_CAPACITY + 25) {
            posts.push(format!("post {}", i));
        }
        assert_eq!(posts.len(), RECENT_CAPACITY);
        assert_eq!(posts.recent.front().unwrap(), "post 25");
        assert_eq!(
            posts.recent.back().unwrap(),
            &format!("post {}", RECENT_CAPACITY + 24)
        );
        assert!(!posts.contains("post 0"));
        assert!(posts.contains("post 25"));
    }

    #[test]
    fn test_contains_is_exact() {
        let mut posts = RecentPosts::default();
        posts.push("Fun fact: owls can't move their eyes.");
        assert!(posts.contains("Fun fact: owls can't move their eyes."));
        assert!(!posts.contains("fun fact: owls can't move their eyes."));
    }

    #[test]
    fn test_tracker_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recent_posts.json");
        let tracker = RecencyTracker::new(&path);
        assert!(!tracker.is_recent("x").unwrap());
        assert_eq!(tracker.record(["x", "y"]).unwrap(), 2);

        let other = RecencyTracker::new(&path);
        assert!(other.is_recent("x").unwrap());
        assert_eq!(other.load().unwrap().recent, VecDeque::from(vec!["x".to_string(), "y".to_string()]));
    }

    #[test]
    fn test_tracker_never_exceeds_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = RecencyTracker::new(dir.path().join("recent_posts.json"));
        tracker
            .record((0..150).map(|i| format!("a{}", i)))
            .unwrap();
        let len = tracker
            .record((0..150).map(|i| format!("b{}", i)))
            .unwrap();
        assert_eq!(len, RECENT_CAPACITY);
        let posts = tracker.load().unwrap();
        assert_eq!(posts.recent.front().unwrap(), "a100");
    }
}
