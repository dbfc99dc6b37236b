//! buildloop - incremental build orchestration
//!
//! Given a caller-supplied build action (optionally incremental via an
//! opaque rebuild-state token), buildloop runs an initial build, optionally
//! enters a persistent watch mode, rebuilds on filesystem change while
//! keeping the watcher subscription aligned with the build's declared
//! dependencies, persists output artifacts atomically, and yields one result
//! per build until cancelled.
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use buildloop::{BuildLoopResult, BuildResult, BuildSequence, RebuildState, RunOptions};
//!
//! let action = |_prior: Option<RebuildState>| -> BuildLoopResult<BuildResult<&'static str>> {
//!     Ok(BuildResult::new("built"))
//! };
//! let options = RunOptions::new("/ws", "/ws/app", "/ws/app/dist").with_watch(true);
//! let running = Arc::new(AtomicBool::new(true));
//!
//! for outcome in BuildSequence::new(action, options, running) {
//!     println!("{:?}", outcome?.summary());
//! }
//! # Ok::<(), buildloop::BuildLoopError>(())
//! ```

pub mod emit;
pub mod error;
pub mod models;
pub mod pool;
pub mod progress;
pub mod sequence;
pub mod watcher;
pub mod watchset;

// Re-exports for convenience
pub use emit::{atomic_write, prepare_output_dir, write_result_files};
pub use error::{BuildLoopError, BuildLoopResult};
pub use models::{BuildAction, BuildOutcome, BuildResult, ChangeSet, FileKind, OutputFile, RebuildState};
pub use pool::WorkerPool;
pub use progress::with_indicator;
pub use sequence::{BuildSequence, EventSink, LoopEvent, RunOptions, WriteFilter};
pub use watcher::{FileWatcher, NotifyWatcher, NotifyWatcherFactory, WatcherConfig, WatcherFactory};
pub use watchset::{watch_delta, WatchDelta};
