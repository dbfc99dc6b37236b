//! Progress indicator wrapper
//!
//! Wraps exactly one build invocation with a human-readable indicator on
//! stderr. Silent when disabled or when stderr is not a terminal, so CI logs
//! and piped output stay clean. The wrapped function's result is returned
//! unchanged either way.

use std::io::Write;
use std::time::Instant;

use is_terminal::IsTerminal;

/// Run `f`, surrounding it with a stderr indicator when `enabled`
pub fn with_indicator<T>(enabled: bool, label: &str, f: impl FnOnce() -> T) -> T {
    if !enabled || !std::io::stderr().is_terminal() {
        return f();
    }

    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "{}... ", label);
    let _ = stderr.flush();

    let started = Instant::now();
    let result = f();

    let _ = writeln!(stderr, "done in {}ms", started.elapsed().as_millis());
    result
}
