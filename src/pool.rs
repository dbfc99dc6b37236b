//! Worker-pool lifecycle handle
//!
//! Build actions commonly lean on a persistent helper subsystem (a worker
//! pool, a daemonized compiler, a cache server) that outlives any single
//! build. The orchestrator does not own that subsystem; the caller hands it
//! a `WorkerPool` handle whose shutdown the loop triggers at the right
//! points: after the build when watch mode is off, and at drain when it is
//! on. Shutdown is idempotent so the caller may also shut it down itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type ShutdownFn = Box<dyn FnOnce() + Send>;

/// Lifetime-scoped handle to a caller-owned helper subsystem
///
/// Cloneable; all clones share the same shutdown, which runs at most once.
#[derive(Clone)]
pub struct WorkerPool {
    shutdown: Arc<Mutex<Option<ShutdownFn>>>,
    shut_down: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Wrap a subsystem's shutdown routine
    pub fn new(shutdown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            shutdown: Arc::new(Mutex::new(Some(Box::new(shutdown)))),
            shut_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for callers with no helper subsystem
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Shut the subsystem down; safe to call any number of times
    pub fn shutdown(&self) {
        let hook = self
            .shutdown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(hook) = hook {
            hook();
            self.shut_down.store(true, Ordering::SeqCst);
        }
    }

    /// Whether shutdown has already run
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn shutdown_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let pool = WorkerPool::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!pool.is_shut_down());
        pool.shutdown();
        pool.shutdown();
        assert!(pool.is_shut_down());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_share_the_shutdown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let pool = WorkerPool::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let clone = pool.clone();
        clone.shutdown();
        pool.shutdown();
        assert!(pool.is_shut_down());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn noop_pool_is_harmless() {
        let pool = WorkerPool::noop();
        pool.shutdown();
        assert!(pool.is_shut_down());
    }
}
