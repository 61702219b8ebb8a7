use std::io;
use std::path::PathBuf;

use finder::FinderError;

/// Unified error type for the build-sources crate.
#[derive(Debug, thiserror::Error)]
pub enum SourcesError {
    #[error(transparent)]
    Finder(#[from] FinderError),

    /// A list file could not be compared or written.
    #[error("failed to {operation} list file {path}: {source}")]
    ListFile {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid build config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using [`SourcesError`].
pub type SourcesResult<T> = Result<T, SourcesError>;
