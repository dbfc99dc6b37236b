//! Watch-set delta computation
//!
//! Between two builds the set of files the watcher must observe shifts with
//! the project's dependency graph. `watch_delta` computes the minimal add and
//! remove sets to bring the live subscription in line with the fresh build's
//! declared watch files. Pure bookkeeping; never touches the watcher itself.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Paths to add to and remove from the live watcher subscription
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchDelta {
    /// Newly declared paths not yet watched
    pub added: BTreeSet<PathBuf>,
    /// Previously watched paths the new build no longer depends on
    pub removed: BTreeSet<PathBuf>,
}

impl WatchDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute `added = current − previous` and `removed = previous − current`
///
/// `current` may contain duplicates and is order-insensitive. An empty
/// `current` removes every previously watched path - a build may legally
/// declare zero dependencies.
pub fn watch_delta<P: AsRef<Path>>(previous: &BTreeSet<PathBuf>, current: &[P]) -> WatchDelta {
    let current: BTreeSet<PathBuf> = current
        .iter()
        .map(|p| p.as_ref().to_path_buf())
        .collect();

    WatchDelta {
        added: current.difference(previous).cloned().collect(),
        removed: previous.difference(&current).cloned().collect(),
    }
}
