//! `notify`-backed watcher
//!
//! Watches the project root recursively plus any explicitly added paths,
//! filters events through a gitignore-style matcher, drops content-unchanged
//! noise, and hands the loop debounced `ChangeSet`s. A polling backend is
//! available for filesystems where native events are unreliable (network
//! mounts, some containers).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::Duration;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use notify::{Config, Event, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{BuildLoopError, BuildLoopResult};
use crate::models::ChangeSet;

use super::debounce::{ContentTracker, DebounceState};
use super::{FileWatcher, WatcherConfig, WatcherFactory};

/// Channel poll tick while waiting for events
const RECV_TICK_MS: u64 = 50;

enum Backend {
    Recommended(RecommendedWatcher),
    Poll(PollWatcher),
}

impl Backend {
    fn watch(&mut self, path: &Path, mode: RecursiveMode) -> notify::Result<()> {
        match self {
            Self::Recommended(w) => w.watch(path, mode),
            Self::Poll(w) => w.watch(path, mode),
        }
    }

    fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        match self {
            Self::Recommended(w) => w.unwatch(path),
            Self::Poll(w) => w.unwatch(path),
        }
    }
}

/// Production watcher on top of `notify`
pub struct NotifyWatcher {
    backend: Option<Backend>,
    rx: Receiver<PathBuf>,
    debounce: DebounceState,
    tracker: ContentTracker,
}

impl NotifyWatcher {
    /// Create a watcher and subscribe the project root recursively
    pub fn new(config: WatcherConfig) -> BuildLoopResult<Self> {
        let matcher = build_ignore_matcher(&config)?;
        let root = config.root.clone();
        let (tx, rx) = channel();

        let handler = move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                for path in event.paths {
                    let rel = path.strip_prefix(&root).unwrap_or(&path);
                    if matcher
                        .matched_path_or_any_parents(rel, path.is_dir())
                        .is_ignore()
                    {
                        continue;
                    }
                    let _ = tx.send(path);
                }
            }
        };

        let mut backend = if config.poll {
            Backend::Poll(PollWatcher::new(
                handler,
                Config::default().with_poll_interval(config.poll_interval),
            )?)
        } else {
            Backend::Recommended(RecommendedWatcher::new(handler, Config::default())?)
        };

        backend.watch(&config.root, RecursiveMode::Recursive)?;

        Ok(Self {
            backend: Some(backend),
            rx,
            debounce: DebounceState::new(),
            tracker: ContentTracker::new(),
        })
    }
}

impl FileWatcher for NotifyWatcher {
    fn add(&mut self, paths: &[PathBuf]) -> BuildLoopResult<()> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };
        for path in paths {
            // Declared watch files may not exist yet (absent lock files,
            // optional configs); they get picked up through the root watch
            // once created.
            if !path.exists() {
                continue;
            }
            backend.watch(path, RecursiveMode::NonRecursive)?;
        }
        Ok(())
    }

    fn remove(&mut self, paths: &[PathBuf]) -> BuildLoopResult<()> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };
        for path in paths {
            match backend.unwatch(path) {
                Ok(()) => {}
                Err(e)
                    if matches!(
                        e.kind,
                        notify::ErrorKind::WatchNotFound | notify::ErrorKind::PathNotFound
                    ) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn next_change(&mut self, running: &AtomicBool) -> Option<ChangeSet> {
        loop {
            if !running.load(Ordering::SeqCst) {
                return None;
            }

            match self.rx.recv_timeout(Duration::from_millis(RECV_TICK_MS)) {
                Ok(path) => {
                    // Directory events carry no content; the contained file
                    // events arrive on their own.
                    if path.is_dir() {
                        continue;
                    }
                    let canonical = path.canonicalize().unwrap_or(path);
                    if self.tracker.record(&canonical) {
                        self.debounce.add_change(canonical);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // Backend gone; flush whatever is pending, then end.
                    if self.debounce.has_pending() {
                        return Some(ChangeSet::new(self.debounce.take_changes()));
                    }
                    return None;
                }
            }

            if self.debounce.should_flush() {
                return Some(ChangeSet::new(self.debounce.take_changes()));
            }
        }
    }

    fn close(&mut self) {
        // Dropping the backend drops the event handler and its sender, so a
        // blocked next_change sees the channel disconnect.
        self.backend = None;
    }
}

/// Compile the fixed ignore set into a gitignore matcher
fn build_ignore_matcher(config: &WatcherConfig) -> BuildLoopResult<Gitignore> {
    let mut builder = GitignoreBuilder::new(&config.root);

    for glob in &config.ignore_globs {
        builder
            .add_line(None, glob)
            .map_err(|e| BuildLoopError::Io(std::io::Error::other(e.to_string())))?;
    }
    for path in &config.ignore_paths {
        // Anchor ignored directories (output dir, cache dir) at their
        // root-relative location; paths outside the root never produce
        // events through the recursive root watch.
        if let Ok(rel) = path.strip_prefix(&config.root) {
            let pattern = format!("/{}/", rel.display());
            builder
                .add_line(None, &pattern)
                .map_err(|e| BuildLoopError::Io(std::io::Error::other(e.to_string())))?;
        }
    }

    builder
        .build()
        .map_err(|e| BuildLoopError::Io(std::io::Error::other(e.to_string())))
}

/// Default factory handing the loop `NotifyWatcher`s
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyWatcherFactory;

impl WatcherFactory for NotifyWatcherFactory {
    fn create(&self, config: WatcherConfig) -> BuildLoopResult<Box<dyn FileWatcher>> {
        Ok(Box::new(NotifyWatcher::new(config)?))
    }
}
