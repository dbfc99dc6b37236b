//! Error types for buildloop
//!
//! Uses `thiserror` for library errors. Setup failures are reported through
//! the event sink and never surface as panics; everything else propagates
//! with `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buildloop operations
pub type BuildLoopResult<T> = Result<T, BuildLoopError>;

/// Main error type for buildloop operations
#[derive(Error, Debug)]
pub enum BuildLoopError {
    /// Output directory could not be prepared (deleted/recreated)
    #[error("failed to prepare output directory {path}: {source}")]
    OutputDirSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Refusal to delete the workspace root as the output directory
    #[error("output path {path} is the workspace root - refusing to delete it")]
    OutputIsWorkspaceRoot { path: PathBuf },

    /// Output file path would land outside the output directory
    #[error("path '{path}' escapes output directory '{root}'")]
    PathEscape { path: PathBuf, root: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Watcher backend error
    #[error("watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Error raised by the caller-supplied build action
    #[error("build action failed: {0}")]
    Action(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BuildLoopError {
    /// Wrap an arbitrary build-action failure
    pub fn action(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Action(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_workspace_root_refusal() {
        let err = BuildLoopError::OutputIsWorkspaceRoot {
            path: PathBuf::from("/work"),
        };
        assert_eq!(
            err.to_string(),
            "output path /work is the workspace root - refusing to delete it"
        );
    }

    #[test]
    fn test_error_display_output_dir_setup() {
        let err = BuildLoopError::OutputDirSetup {
            path: PathBuf::from("/work/dist"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err
            .to_string()
            .starts_with("failed to prepare output directory /work/dist"));
    }

    #[test]
    fn test_error_display_path_escape() {
        let err = BuildLoopError::PathEscape {
            path: PathBuf::from("../escaped.txt"),
            root: PathBuf::from("/work/dist"),
        };
        assert_eq!(
            err.to_string(),
            "path '../escaped.txt' escapes output directory '/work/dist'"
        );
    }

    #[test]
    fn test_action_error_preserves_source() {
        let err = BuildLoopError::action(std::io::Error::other("bundler exploded"));
        assert!(err.to_string().contains("build action failed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
