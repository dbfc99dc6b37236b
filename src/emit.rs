//! Artifact persistence
//!
//! Prepares the output directory for a run and writes build results into it.
//! Writes are atomic (temp file in the destination directory, then rename)
//! so a crash mid-write never leaves a half-written artifact behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{BuildLoopError, BuildLoopResult};
use crate::models::OutputFile;

/// Prepare the output directory for one orchestrator run
///
/// With `delete` set, removes the existing output tree first (an absent tree
/// is fine) and refuses outright when the resolved output path is the
/// workspace root - the one directory a build must never delete. The
/// directory is then (re)created. Any failure here is fatal to the run.
pub fn prepare_output_dir(
    output_path: &Path,
    workspace_root: &Path,
    delete: bool,
) -> BuildLoopResult<()> {
    if delete {
        if resolve(output_path) == resolve(workspace_root) {
            return Err(BuildLoopError::OutputIsWorkspaceRoot {
                path: output_path.to_path_buf(),
            });
        }
        if let Err(source) = fs::remove_dir_all(output_path) {
            if source.kind() != std::io::ErrorKind::NotFound {
                return Err(BuildLoopError::OutputDirSetup {
                    path: output_path.to_path_buf(),
                    source,
                });
            }
        }
    }

    fs::create_dir_all(output_path).map_err(|source| BuildLoopError::OutputDirSetup {
        path: output_path.to_path_buf(),
        source,
    })
}

/// Resolve symlinks for the equality check; fall back to the path as given
/// when it does not exist yet
fn resolve(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Persist one build's files under the output directory
///
/// `outputs` is the (possibly predicate-filtered) regular output set,
/// `assets` the asset set - kept separate because assets are never filtered.
/// File paths must stay inside the output directory; absolute paths and
/// `..` traversal are rejected before anything is written.
/// Returns the number of files written.
pub fn write_result_files<'a>(
    outputs: impl IntoIterator<Item = &'a OutputFile>,
    assets: impl IntoIterator<Item = &'a OutputFile>,
    output_path: &Path,
) -> BuildLoopResult<usize> {
    let mut written = 0;
    for file in outputs.into_iter().chain(assets) {
        atomic_write(&contained_join(output_path, file.path())?, file.contents())?;
        written += 1;
    }
    Ok(written)
}

/// Join a result-file path onto the output directory, rejecting anything
/// that would resolve outside it
///
/// `Path::join` replaces the base entirely for absolute paths, and `..`
/// components climb out of the tree, so both are refused outright rather
/// than normalized.
fn contained_join(output_path: &Path, file_path: &Path) -> BuildLoopResult<PathBuf> {
    use std::path::Component;

    let escapes = file_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || file_path.as_os_str().is_empty() {
        return Err(BuildLoopError::PathEscape {
            path: file_path.to_path_buf(),
            root: output_path.to_path_buf(),
        });
    }
    Ok(output_path.join(file_path))
}

/// Write content to a file atomically
///
/// Uses the tempfile + rename pattern, creating parent directories on demand.
/// The temp file lives in the destination directory so the rename never
/// crosses a filesystem boundary.
pub fn atomic_write(path: &Path, contents: &[u8]) -> BuildLoopResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
