//! Finder - main API for cached directory scans.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cache::{self, CacheDatabase};
use crate::cancel::CancellationToken;
use crate::error::{FinderError, Result};
use crate::fs::{FileSystem, OsFs};
use crate::params::{clean_path, CacheParams};
use crate::query::{self, DirMatches, DirView};
use crate::walker::{ScanStats, Walker};

/// A scanned tree ready for queries.
///
/// Construction loads the previous snapshot from `cache_path` and refreshes
/// it against the filesystem. [`Finder::shutdown`] writes the refreshed
/// snapshot back. Queries take `&self` and may run concurrently.
#[derive(Debug)]
pub struct Finder {
    params: CacheParams,
    cache_path: PathBuf,
    database: CacheDatabase,
    stats: ScanStats,
    complete: bool,
}

impl Finder {
    /// Scans the real filesystem below `params.working_directory`.
    pub fn open(params: CacheParams, cache_path: impl Into<PathBuf>) -> Result<Self> {
        let fs = OsFs::new(params.working_directory.clone());
        Self::new(params, &fs, cache_path)
    }

    /// Loads the cache at `cache_path` and scans through `fs`.
    pub fn new(
        params: CacheParams,
        fs: &dyn FileSystem,
        cache_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::with_cancel(params, fs, cache_path, CancellationToken::noop())
    }

    /// Like [`Finder::new`], but the scan stops early once `cancel` fires.
    ///
    /// A cancelled finder answers queries from the previous snapshot and
    /// refuses to persist it.
    pub fn with_cancel(
        params: CacheParams,
        fs: &dyn FileSystem,
        cache_path: impl Into<PathBuf>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let cache_path = cache_path.into();

        let load_started = Instant::now();
        let previous = match cache::load(&cache_path, &params) {
            Ok(database) => database,
            Err(error) => {
                tracing::warn!("ignoring finder cache, rescanning everything: {error}");
                CacheDatabase::empty(params.fingerprint())
            }
        };
        tracing::debug!(
            "finder cache load took {} ms ({} directories)",
            load_started.elapsed().as_millis(),
            previous.len()
        );

        let walker = Walker::new(&params, fs, &previous).with_cancel(cancel);
        let scanned = walker.scan()?;
        let stats = walker.stats();
        drop(walker);

        let (database, complete) = match scanned {
            Some(database) => (database, true),
            None => (previous, false),
        };

        Ok(Self {
            params,
            cache_path,
            database,
            stats,
            complete,
        })
    }

    pub fn params(&self) -> &CacheParams {
        &self.params
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn database(&self) -> &CacheDatabase {
        &self.database
    }

    /// Counters from the scan that built this finder.
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// False if the scan was cancelled and queries see the previous snapshot.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Paths of `name` below `start`, not looking below a directory that
    /// contains it.
    pub fn find_first_named_at(&self, start: impl AsRef<Path>, name: &str) -> Vec<String> {
        if !self.named_query_allowed(name) {
            return Vec::new();
        }
        query::find_first_named_at(&self.database, &clean_path(start.as_ref()), name)
    }

    /// Paths of every `name` below `start`.
    pub fn find_named_at(&self, start: impl AsRef<Path>, name: &str) -> Vec<String> {
        if !self.named_query_allowed(name) {
            return Vec::new();
        }
        query::find_named_at(&self.database, &clean_path(start.as_ref()), name)
    }

    /// [`Finder::find_first_named_at`] over every root.
    pub fn find_first_named(&self, name: &str) -> Vec<String> {
        self.params
            .cleaned_roots()
            .iter()
            .flat_map(|root| self.find_first_named_at(root, name))
            .collect()
    }

    /// [`Finder::find_named_at`] over every root.
    pub fn find_named(&self, name: &str) -> Vec<String> {
        self.params
            .cleaned_roots()
            .iter()
            .flat_map(|root| self.find_named_at(root, name))
            .collect()
    }

    /// Every file below every root.
    pub fn find_all(&self) -> Vec<String> {
        self.params
            .cleaned_roots()
            .iter()
            .flat_map(|root| query::find_all_at(&self.database, root))
            .collect()
    }

    /// Files chosen by `predicate`, which also decides which subdirectories
    /// of each directory are visited.
    pub fn find_matching<F>(&self, start: impl AsRef<Path>, predicate: F) -> Vec<String>
    where
        F: Fn(&DirView<'_>) -> DirMatches + Sync,
    {
        query::find_matching(&self.database, &clean_path(start.as_ref()), &predicate)
    }

    /// Persists the scanned tree to the cache path.
    ///
    /// A cancelled scan is never written, so the on-disk snapshot always
    /// describes a complete walk.
    pub fn shutdown(self) -> Result<()> {
        if !self.complete {
            tracing::warn!(
                "not saving finder cache {}: scan was cancelled",
                self.cache_path.display()
            );
            return Err(FinderError::Cancelled);
        }
        cache::save(&self.database, &self.params, &self.cache_path)
    }

    fn named_query_allowed(&self, name: &str) -> bool {
        if self.params.is_included(name) {
            return true;
        }
        tracing::warn!("finder is not configured to look for {name}");
        false
    }
}
