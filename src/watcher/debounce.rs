//! Change debouncing and content-hash filtering
//!
//! Editors and build tools produce event bursts: one save can surface as
//! several notify events, and auto-save features fire events with unchanged
//! content. `DebounceState` coalesces bursts (100ms window) and
//! `ContentTracker` drops events whose file content did not actually change.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// Debounce window in milliseconds
pub(crate) const DEBOUNCE_MS: u64 = 100;

/// Pending-change accumulator with a quiet-period flush
#[derive(Debug, Default)]
pub(crate) struct DebounceState {
    pending: HashSet<PathBuf>,
    last_change: Option<Instant>,
}

impl DebounceState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_change(&mut self, path: PathBuf) {
        self.pending.insert(path);
        self.last_change = Some(Instant::now());
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Flush once changes are pending and the burst has gone quiet
    pub(crate) fn should_flush(&self) -> bool {
        match self.last_change {
            Some(last) => {
                !self.pending.is_empty() && last.elapsed() >= Duration::from_millis(DEBOUNCE_MS)
            }
            None => false,
        }
    }

    pub(crate) fn take_changes(&mut self) -> Vec<PathBuf> {
        let changes: Vec<_> = self.pending.drain().collect();
        self.last_change = None;
        changes
    }
}

/// SHA-256 of file content, hex-encoded
pub(crate) fn content_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// Last-observed content hashes, used to drop no-op events
#[derive(Debug, Default)]
pub(crate) struct ContentTracker {
    hashes: HashMap<PathBuf, String>,
}

impl ContentTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record an event for `path`; true when the content actually changed
    ///
    /// Unreadable paths (deleted files) always count as changed and forget
    /// any stored hash.
    pub(crate) fn record(&mut self, path: &Path) -> bool {
        match std::fs::read(path) {
            Ok(content) => {
                let new_hash = content_hash(&content);
                if self.hashes.get(path) == Some(&new_hash) {
                    return false;
                }
                self.hashes.insert(path.to_path_buf(), new_hash);
                true
            }
            Err(_) => {
                self.hashes.remove(path);
                true
            }
        }
    }
}
