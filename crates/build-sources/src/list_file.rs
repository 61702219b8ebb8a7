//! Idempotent list files.
//!
//! Downstream build steps treat a list file's modification time as a change
//! signal, so a list is only rewritten when its content differs.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{SourcesError, SourcesResult};

/// Writes `paths` newline-separated to `target` unless it already holds
/// exactly that content.
///
/// Returns whether the file was written.
pub fn write_if_changed(paths: &[String], target: &Path) -> SourcesResult<bool> {
    let desired = paths.join("\n");

    match fs::read(target) {
        Ok(actual) if actual == desired.as_bytes() => {
            tracing::debug!("{} is up to date", target.display());
            return Ok(false);
        }
        Ok(_) => {}
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => {
            return Err(SourcesError::ListFile {
                operation: "read",
                path: target.to_path_buf(),
                source: error,
            })
        }
    }

    fs::write(target, desired.as_bytes()).map_err(|error| SourcesError::ListFile {
        operation: "write",
        path: target.to_path_buf(),
        source: error,
    })?;
    tracing::debug!("wrote {} ({} entries)", target.display(), paths.len());
    Ok(true)
}
