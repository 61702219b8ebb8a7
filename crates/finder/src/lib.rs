//! Cached directory scanning and structural file queries.
//!
//! This crate provides:
//! - An incremental walker that only re-lists directories whose stamp changed
//! - A persistent cache of directory listings, invalidated by rule changes
//! - Name and predicate queries over the scanned tree

pub mod cache;
pub mod cancel;
pub mod error;
pub mod finder;
pub mod fs;
pub mod params;
pub mod query;
pub mod walker;

// Re-export main types
pub use cache::{CacheDatabase, DirectoryEntry};
pub use cancel::CancellationToken;
pub use error::{FinderError, Result};
pub use finder::Finder;
pub use fs::{DirStamp, FileSystem, OsFs};
pub use params::CacheParams;
pub use query::{DirMatches, DirView};
pub use walker::ScanStats;
