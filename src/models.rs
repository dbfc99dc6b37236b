//! Core data model for buildloop
//!
//! Defines the fundamental structures moved through the orchestration loop:
//! - `OutputFile`: one produced artifact with its destination-relative path
//! - `ChangeSet`: the filesystem paths that changed between two observations
//! - `RebuildState`: opaque incremental continuation passed between builds
//! - `BuildResult`: everything one invocation of the build action produced
//! - `BuildAction`: the caller-supplied build itself
//! - `BuildOutcome`: the unit yielded to the consumer per completed build

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::BuildLoopResult;

/// Kind of produced file
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Regular build output (subject to the per-file write predicate)
    Output,
    /// Asset copied alongside outputs (never filtered)
    Asset,
}

/// One produced file: destination-relative path, raw contents, kind tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    path: PathBuf,
    contents: Vec<u8>,
    kind: FileKind,
}

impl OutputFile {
    /// Create an output file record
    ///
    /// `path` is relative to the output directory.
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>, kind: FileKind) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            kind,
        }
    }

    /// Destination-relative path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// File kind tag
    pub fn kind(&self) -> FileKind {
        self.kind
    }
}

/// Set of filesystem paths reported changed between two observations
///
/// Paths are deduplicated and sorted so change handling and logs are
/// deterministic regardless of event arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    paths: Vec<PathBuf>,
}

impl ChangeSet {
    /// Build a change set from raw event paths (duplicates collapsed)
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut paths: Vec<PathBuf> = paths.into_iter().collect();
        paths.sort();
        paths.dedup();
        Self { paths }
    }

    /// The changed paths, sorted
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Human-readable one-line summary for verbose logging
    pub fn describe(&self) -> String {
        const SHOWN: usize = 5;
        let names: Vec<String> = self
            .paths
            .iter()
            .take(SHOWN)
            .map(|p| p.display().to_string())
            .collect();
        let suffix = if self.paths.len() > SHOWN {
            format!(" (+{} more)", self.paths.len() - SHOWN)
        } else {
            String::new()
        };
        format!(
            "{} changed: {}{}",
            match self.paths.len() {
                1 => "1 file".to_string(),
                n => format!("{} files", n),
            },
            names.join(", "),
            suffix
        )
    }
}

/// Opaque incremental-build continuation
///
/// Produced by the previous `BuildResult`'s rebuild hook, handed to the next
/// invocation of the build action. The orchestrator never looks inside.
pub struct RebuildState(Box<dyn Any + Send>);

impl RebuildState {
    /// Wrap any value as rebuild state
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Recover the concrete state on the build-action side
    pub fn downcast<T: Any + Send>(self) -> Result<Box<T>, RebuildState> {
        self.0.downcast::<T>().map_err(RebuildState)
    }
}

impl fmt::Debug for RebuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RebuildState(..)")
    }
}

type RebuildFn = Box<dyn FnOnce(&ChangeSet) -> RebuildState + Send>;
type TeardownFn = Box<dyn FnOnce() + Send>;

/// Outcome of one invocation of the build action
///
/// Carries the produced files, the absolute paths this build depends on
/// (feeding the watcher subscription), a caller-defined summary, and two
/// optional hooks: one deriving the next incremental state from a change
/// set, one releasing resources (persistent compiler state, caches) held by
/// this result.
///
/// Teardown runs exactly once: explicitly when the result is superseded or
/// the loop drains, with `Drop` as the backstop so a result can never leak
/// its resources silently.
pub struct BuildResult<S> {
    summary: S,
    outputs: Vec<OutputFile>,
    watch_files: Vec<PathBuf>,
    rebuild: Option<RebuildFn>,
    teardown: Option<TeardownFn>,
}

impl<S> BuildResult<S> {
    /// Create a result with the given summary and no files or hooks
    pub fn new(summary: S) -> Self {
        Self {
            summary,
            outputs: Vec::new(),
            watch_files: Vec::new(),
            rebuild: None,
            teardown: None,
        }
    }

    /// Attach produced files
    pub fn with_outputs(mut self, outputs: Vec<OutputFile>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Declare the absolute paths this build depends on
    pub fn with_watch_files(mut self, watch_files: Vec<PathBuf>) -> Self {
        self.watch_files = watch_files;
        self
    }

    /// Attach the incremental-state hook invoked when a change arrives
    pub fn with_rebuild(
        mut self,
        rebuild: impl FnOnce(&ChangeSet) -> RebuildState + Send + 'static,
    ) -> Self {
        self.rebuild = Some(Box::new(rebuild));
        self
    }

    /// Attach the teardown releasing resources held by this result
    pub fn with_teardown(mut self, teardown: impl FnOnce() + Send + 'static) -> Self {
        self.teardown = Some(Box::new(teardown));
        self
    }

    /// Caller-defined summary for reporting
    pub fn summary(&self) -> &S {
        &self.summary
    }

    /// Produced files, in build order
    pub fn outputs(&self) -> &[OutputFile] {
        &self.outputs
    }

    /// Absolute dependency paths declared by this build
    pub fn watch_files(&self) -> &[PathBuf] {
        &self.watch_files
    }

    /// Derive the next incremental state from the detected changes
    ///
    /// Consumes the hook; a result feeds at most one follow-up build.
    pub(crate) fn next_rebuild_state(&mut self, changes: &ChangeSet) -> Option<RebuildState> {
        self.rebuild.take().map(|derive| derive(changes))
    }

    /// Release resources held by this result (idempotent)
    pub fn dispose(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl<S> Drop for BuildResult<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<S: fmt::Debug> fmt::Debug for BuildResult<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildResult")
            .field("summary", &self.summary)
            .field("outputs", &self.outputs.len())
            .field("watch_files", &self.watch_files)
            .field("rebuild", &self.rebuild.is_some())
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}

/// The caller-supplied build
///
/// `prior` is `None` for the first invocation and carries the previous
/// result's rebuild state afterwards. May be stateful across calls.
pub trait BuildAction {
    /// Caller-defined per-build summary type
    type Summary;

    fn build(
        &mut self,
        prior: Option<RebuildState>,
    ) -> BuildLoopResult<BuildResult<Self::Summary>>;
}

impl<S, F> BuildAction for F
where
    F: FnMut(Option<RebuildState>) -> BuildLoopResult<BuildResult<S>>,
{
    type Summary = S;

    fn build(&mut self, prior: Option<RebuildState>) -> BuildLoopResult<BuildResult<S>> {
        self(prior)
    }
}

/// Unit yielded to the consumer for one completed build
///
/// When outputs are persisted to disk the consumer gets the plain summary;
/// with persistence disabled it gets the summary plus the in-memory files.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome<S> {
    /// Outputs were written to the output directory
    Summary(S),
    /// Outputs were kept in memory (`write_to_disk` off)
    WithFiles { summary: S, files: Vec<OutputFile> },
}

impl<S> BuildOutcome<S> {
    pub fn summary(&self) -> &S {
        match self {
            Self::Summary(summary) => summary,
            Self::WithFiles { summary, .. } => summary,
        }
    }

    /// In-memory files, present only when persistence is disabled
    pub fn files(&self) -> Option<&[OutputFile]> {
        match self {
            Self::Summary(_) => None,
            Self::WithFiles { files, .. } => Some(files),
        }
    }
}
