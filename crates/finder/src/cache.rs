//! Cache store for scanned directories.
//!
//! This module holds the durable representation of the last known tree:
//! - `entry` - one scanned directory and its staleness check
//! - `database` - every entry of a session, keyed by path
//! - `persistence` - load/save of the database to a single cache file

mod database;
mod entry;
mod persistence;

pub use database::CacheDatabase;
pub use entry::{is_stale, DirectoryEntry};
pub use persistence::{load, save, FINDER_CACHE_VERSION};
