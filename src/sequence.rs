//! The build orchestration loop
//!
//! Runs the build-then-watch-then-rebuild protocol and exposes it as a
//! lazily produced, cancellable sequence of results:
//!
//! - prepare the output directory (with a hard refusal to delete the
//!   workspace root)
//! - run the initial build and persist or hand back its outputs
//! - in watch mode, subscribe the watcher *after* the first emission so the
//!   loop's own writes can never race watcher startup, then rebuild on every
//!   debounced change set until cancelled
//! - keep the watcher subscription in sync with each build's declared
//!   dependencies via minimal add/remove deltas
//! - drain (close watcher, dispose the last result, shut the worker pool
//!   down) on every exit path: normal completion, cancellation, propagated
//!   error, or the consumer dropping the sequence early

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::emit::{prepare_output_dir, write_result_files};
use crate::error::BuildLoopResult;
use crate::models::{BuildAction, BuildOutcome, BuildResult, FileKind, OutputFile};
use crate::pool::WorkerPool;
use crate::progress::with_indicator;
use crate::watcher::{FileWatcher, NotifyWatcherFactory, WatcherConfig, WatcherFactory};
use crate::watchset::watch_delta;

/// Per-file write predicate applied to change-triggered rebuild writes
pub type WriteFilter = Box<dyn Fn(&OutputFile) -> bool + Send>;

/// Event sink for NDJSON/CI logging
pub type EventSink = Box<dyn Fn(&LoopEvent) + Send>;

/// Loop events for logging and CI output
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LoopEvent {
    BuildStarted,
    OutputsWritten {
        written: usize,
    },
    WatchStarted {
        root: String,
    },
    /// Emitted per change set, verbose mode only
    ChangedFiles {
        paths: Vec<String>,
        summary: String,
    },
    Fatal {
        message: String,
    },
    Shutdown,
}

impl LoopEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Configuration for one orchestrator run
///
/// Immutable for the lifetime of the run. Everything not set through a
/// `with_*` builder keeps its default: write to disk, no watch, native
/// watcher backend, quiet.
pub struct RunOptions {
    /// Directory the run must never delete, even as output path
    pub workspace_root: PathBuf,
    /// Directory watched recursively in watch mode
    pub project_root: PathBuf,
    /// Destination tree for build outputs
    pub output_path: PathBuf,
    /// Cache directory, excluded from watching
    pub cache_path: PathBuf,
    /// Persist outputs to disk (default on)
    pub write_to_disk: bool,
    /// Keep watching and rebuilding after the first build
    pub watch: bool,
    /// Use the polling watcher backend
    pub poll: bool,
    /// Scan interval for the polling backend
    pub poll_interval: Duration,
    /// Log individual change sets
    pub verbose: bool,
    /// Show a progress indicator around each build
    pub progress: bool,
    /// Delete the output tree before the first build
    pub delete_output_path: bool,
    /// Always-watched manifest and lock files
    pub manifest_files: Vec<PathBuf>,
    write_filter: Option<WriteFilter>,
    pool: WorkerPool,
}

impl RunOptions {
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        project_root: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        let project_root = project_root.into();
        Self {
            workspace_root: workspace_root.into(),
            output_path: output_path.into(),
            cache_path: project_root.join(".buildloop-cache"),
            manifest_files: Self::default_manifest_files(&project_root),
            project_root,
            write_to_disk: true,
            watch: false,
            poll: false,
            poll_interval: Duration::from_secs(1),
            verbose: false,
            progress: false,
            delete_output_path: false,
            write_filter: None,
            pool: WorkerPool::noop(),
        }
    }

    /// Manifest plus the lock files of the common package-manager conventions
    pub fn default_manifest_files(project_root: &std::path::Path) -> Vec<PathBuf> {
        ["package.json", "package-lock.json", "yarn.lock", "pnpm-lock.yaml"]
            .iter()
            .map(|name| project_root.join(name))
            .collect()
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_write_to_disk(mut self, write: bool) -> Self {
        self.write_to_disk = write;
        self
    }

    /// Restrict change-triggered rebuild writes to files the predicate
    /// accepts; the first build and asset files always write in full
    pub fn with_write_filter(
        mut self,
        filter: impl Fn(&OutputFile) -> bool + Send + 'static,
    ) -> Self {
        self.write_filter = Some(Box::new(filter));
        self
    }

    pub fn with_polling(mut self, poll: bool) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_delete_output_path(mut self, delete: bool) -> Self {
        self.delete_output_path = delete;
        self
    }

    pub fn with_cache_path(mut self, cache_path: impl Into<PathBuf>) -> Self {
        self.cache_path = cache_path.into();
        self
    }

    pub fn with_manifest_files(mut self, manifest_files: Vec<PathBuf>) -> Self {
        self.manifest_files = manifest_files;
        self
    }

    /// Hand the loop the caller's helper-subsystem handle; the loop shuts it
    /// down after the build when not watching, and at drain when watching
    pub fn with_worker_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Initial,
    Watching,
    Finished,
}

/// The cancellable sequence of build outcomes
///
/// One item per completed build: exactly one when watch mode is off, one per
/// change set otherwise, until `running` goes false. Build-action and write
/// errors surface as `Err` items and end the sequence; drain still runs.
pub struct BuildSequence<A: BuildAction> {
    action: A,
    options: RunOptions,
    running: Arc<AtomicBool>,
    on_event: EventSink,
    factory: Box<dyn WatcherFactory>,
    watcher: Option<Box<dyn FileWatcher>>,
    current: Option<BuildResult<A::Summary>>,
    watched: BTreeSet<PathBuf>,
    state: LoopState,
    drained: bool,
}

impl<A: BuildAction> BuildSequence<A> {
    /// Create a sequence; nothing runs until the first `next()`
    ///
    /// `running` is the external cancellation signal: flip it to `false` and
    /// the loop exits between change detection and rebuild, never aborting a
    /// build already in flight.
    pub fn new(action: A, options: RunOptions, running: Arc<AtomicBool>) -> Self {
        Self {
            action,
            options,
            running,
            on_event: Box::new(|_| {}),
            factory: Box::new(NotifyWatcherFactory),
            watcher: None,
            current: None,
            watched: BTreeSet::new(),
            state: LoopState::Initial,
            drained: false,
        }
    }

    /// Receive loop events (NDJSON logging, CI reporting)
    pub fn with_event_sink(mut self, sink: impl Fn(&LoopEvent) + Send + 'static) -> Self {
        self.on_event = Box::new(sink);
        self
    }

    /// Substitute the watcher implementation (tests, exotic backends)
    pub fn with_watcher_factory(mut self, factory: impl WatcherFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    fn emit_event(&self, event: LoopEvent) {
        (self.on_event)(&event);
    }

    /// Drain: release watcher, last result, and worker pool; idempotent.
    /// Every release is attempted regardless of the others.
    fn finish(&mut self) {
        self.state = LoopState::Finished;
        if self.drained {
            return;
        }
        self.drained = true;

        if let Some(mut watcher) = self.watcher.take() {
            watcher.close();
        }
        if let Some(mut result) = self.current.take() {
            result.dispose();
        }
        self.options.pool.shutdown();
        self.emit_event(LoopEvent::Shutdown);
    }
}

impl<A: BuildAction> BuildSequence<A>
where
    A::Summary: Clone,
{
    fn first_build(&mut self) -> Option<BuildLoopResult<BuildOutcome<A::Summary>>> {
        if self.options.write_to_disk {
            if let Err(err) = prepare_output_dir(
                &self.options.output_path,
                &self.options.workspace_root,
                self.options.delete_output_path,
            ) {
                self.emit_event(LoopEvent::Fatal {
                    message: err.to_string(),
                });
                self.finish();
                return None;
            }
        }

        self.emit_event(LoopEvent::BuildStarted);
        let progress = self.options.progress;
        let built = with_indicator(progress, "Building", || self.action.build(None));
        let result = match built {
            Ok(result) => result,
            Err(err) => {
                self.finish();
                return Some(Err(err));
            }
        };

        if !self.options.watch {
            self.options.pool.shutdown();
        }

        // First emission strictly precedes watcher creation, so the loop's
        // own output writes cannot surface as change events.
        let outcome = match self.emit_outcome(&result, false) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.finish();
                return Some(Err(err));
            }
        };

        if self.options.watch {
            self.emit_event(LoopEvent::WatchStarted {
                root: self.options.project_root.display().to_string(),
            });
            match self.setup_watcher(&result) {
                Ok(watcher) => self.watcher = Some(watcher),
                Err(err) => {
                    self.finish();
                    return Some(Err(err));
                }
            }
            self.watched = result.watch_files().iter().cloned().collect();
            self.current = Some(result);
            self.state = LoopState::Watching;
        } else {
            self.current = Some(result);
            self.finish();
        }

        Some(Ok(outcome))
    }

    fn next_rebuild(&mut self) -> Option<BuildLoopResult<BuildOutcome<A::Summary>>> {
        let running = self.running.clone();
        let changes = match self
            .watcher
            .as_mut()
            .and_then(|watcher| watcher.next_change(&running))
        {
            Some(changes) => changes,
            None => {
                // Cancelled, or the watcher completed on its own.
                self.finish();
                return None;
            }
        };

        // Fast exit between change detection and rebuild.
        if !running.load(Ordering::SeqCst) {
            self.finish();
            return None;
        }

        if self.options.verbose {
            self.emit_event(LoopEvent::ChangedFiles {
                paths: changes
                    .paths()
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect(),
                summary: changes.describe(),
            });
        }

        let prior = self
            .current
            .as_mut()
            .and_then(|result| result.next_rebuild_state(&changes));

        self.emit_event(LoopEvent::BuildStarted);
        let progress = self.options.progress;
        let built = with_indicator(progress, "Rebuilding", || self.action.build(prior));
        let result = match built {
            Ok(result) => result,
            Err(err) => {
                self.finish();
                return Some(Err(err));
            }
        };

        // Bring the subscription in line with the new dependency graph.
        // Manifest paths are watched for the whole run, so a build that
        // listed one among its watch files and then dropped it must not
        // unsubscribe it.
        let mut delta = watch_delta(&self.watched, result.watch_files());
        delta
            .removed
            .retain(|path| !self.options.manifest_files.contains(path));
        if let Some(watcher) = self.watcher.as_mut() {
            if !delta.added.is_empty() {
                let added: Vec<PathBuf> = delta.added.iter().cloned().collect();
                if let Err(err) = watcher.add(&added) {
                    self.finish();
                    return Some(Err(err));
                }
            }
            if !delta.removed.is_empty() {
                let removed: Vec<PathBuf> = delta.removed.iter().cloned().collect();
                if let Err(err) = watcher.remove(&removed) {
                    self.finish();
                    return Some(Err(err));
                }
            }
        }
        self.watched = result.watch_files().iter().cloned().collect();

        // The previous result is superseded only now that its rebuild hook
        // has run and the watch-set delta is applied.
        if let Some(mut previous) = self.current.take() {
            previous.dispose();
        }

        match self.emit_outcome(&result, true) {
            Ok(outcome) => {
                self.current = Some(result);
                Some(Ok(outcome))
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }

    /// Persist the result's files (or capture them in memory) and build the
    /// unit handed to the consumer
    fn emit_outcome(
        &self,
        result: &BuildResult<A::Summary>,
        apply_filter: bool,
    ) -> BuildLoopResult<BuildOutcome<A::Summary>> {
        if self.options.write_to_disk {
            let outputs = result.outputs().iter().filter(|file| {
                file.kind() == FileKind::Output
                    && (!apply_filter
                        || self
                            .options
                            .write_filter
                            .as_ref()
                            .map_or(true, |keep| keep(file)))
            });
            let assets = result
                .outputs()
                .iter()
                .filter(|file| file.kind() == FileKind::Asset);

            let written = write_result_files(outputs, assets, &self.options.output_path)?;
            self.emit_event(LoopEvent::OutputsWritten { written });

            Ok(BuildOutcome::Summary(result.summary().clone()))
        } else {
            Ok(BuildOutcome::WithFiles {
                summary: result.summary().clone(),
                files: result.outputs().to_vec(),
            })
        }
    }

    fn setup_watcher(
        &mut self,
        result: &BuildResult<A::Summary>,
    ) -> BuildLoopResult<Box<dyn FileWatcher>> {
        let config = WatcherConfig {
            root: self.options.project_root.clone(),
            poll: self.options.poll,
            poll_interval: self.options.poll_interval,
            ignore_paths: vec![
                self.options.output_path.clone(),
                self.options.cache_path.clone(),
            ],
            ignore_globs: vec!["node_modules/".to_string(), ".*/".to_string()],
        };

        let mut watcher = self.factory.create(config)?;
        watcher.add(&self.options.manifest_files)?;
        watcher.add(result.watch_files())?;
        Ok(watcher)
    }
}

impl<A: BuildAction> Iterator for BuildSequence<A>
where
    A::Summary: Clone,
{
    type Item = BuildLoopResult<BuildOutcome<A::Summary>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            LoopState::Finished => None,
            LoopState::Initial => self.first_build(),
            LoopState::Watching => self.next_rebuild(),
        }
    }
}

impl<A: BuildAction> Drop for BuildSequence<A> {
    fn drop(&mut self) {
        // Early consumer drop still drains watcher, result, and pool.
        self.finish();
    }
}
