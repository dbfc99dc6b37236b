//! Filesystem watching
//!
//! The orchestration loop talks to the watcher through the `FileWatcher`
//! trait: a broad recursive subscription on the project root, per-path
//! add/remove as the dependency graph shifts, and a blocking pull of the
//! next debounced change set. `NotifyWatcher` is the production
//! implementation on top of the `notify` backend; tests substitute scripted
//! implementations through `WatcherFactory`.

mod debounce;
mod notify_impl;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::error::BuildLoopResult;
use crate::models::ChangeSet;

pub use notify_impl::{NotifyWatcher, NotifyWatcherFactory};

/// Configuration for one watcher instance
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Project root, watched recursively
    pub root: PathBuf,
    /// Use the polling backend instead of native OS events
    pub poll: bool,
    /// Scan interval for the polling backend
    pub poll_interval: Duration,
    /// Absolute paths whose subtrees never produce events (output dir, cache dir)
    pub ignore_paths: Vec<PathBuf>,
    /// Gitignore-style patterns filtered out of the event stream
    pub ignore_globs: Vec<String>,
}

/// Live watcher subscription
///
/// Implementations deliver change sets already debounced and filtered; the
/// loop never sees raw event noise.
pub trait FileWatcher: Send {
    /// Subscribe additional paths (non-recursive); absent paths are skipped
    fn add(&mut self, paths: &[PathBuf]) -> BuildLoopResult<()>;

    /// Drop paths from the subscription; unknown paths are ignored
    fn remove(&mut self, paths: &[PathBuf]) -> BuildLoopResult<()>;

    /// Block until the next change set
    ///
    /// Returns `None` once `running` goes false or the backend ends; either
    /// way the watcher produces nothing further.
    fn next_change(&mut self, running: &AtomicBool) -> Option<ChangeSet>;

    /// Release the backend; further `next_change` calls return `None`
    fn close(&mut self);
}

/// Creates watchers on demand
///
/// The loop only constructs a watcher when watch mode is requested, and only
/// after the first build's outputs are on disk.
pub trait WatcherFactory {
    fn create(&self, config: WatcherConfig) -> BuildLoopResult<Box<dyn FileWatcher>>;
}
