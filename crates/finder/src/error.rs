use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    /// A configured root could not be established; the scan cannot continue.
    #[error("cannot scan root {path}: {reason}")]
    FatalScan { path: PathBuf, reason: String },

    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode finder cache {path}: {reason}")]
    CacheDecode { path: PathBuf, reason: String },

    #[error("scan was cancelled before completion")]
    Cancelled,
}

impl FinderError {
    /// Wraps an I/O error with the operation and path that produced it.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn fatal_scan(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FatalScan {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FinderError>;
