//! Incremental directory walk.
//!
//! The walker visits every directory reachable from the configured roots.
//! For each one it stats the directory and compares the stamp against the
//! previous session's entry: an unchanged directory reuses its stored
//! listing, anything else is listed again. Sibling subtrees are walked in
//! parallel with rayon; each directory is visited by exactly one task and
//! entries are returned up the recursion, so no shared map is mutated.
//!
//! The result only contains directories visited in this walk. Anything that
//! was deleted, excluded or pruned since the last session falls out.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::cache::{is_stale, CacheDatabase, DirectoryEntry};
use crate::cancel::CancellationToken;
use crate::error::{FinderError, Result};
use crate::fs::{DirStamp, FileSystem};
use crate::params::{join_child, CacheParams};

/// Counters describing how much filesystem work a walk did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Directories listed from the filesystem.
    pub dirs_listed: usize,
    /// Directories whose cached listing was still current.
    pub dirs_reused: usize,
    /// Directories that vanished or could not be read.
    pub dirs_skipped: usize,
    /// Files seen across all visited directories.
    pub files_seen: usize,
}

#[derive(Debug, Default)]
struct ScanCounters {
    dirs_listed: AtomicUsize,
    dirs_reused: AtomicUsize,
    dirs_skipped: AtomicUsize,
    files_seen: AtomicUsize,
}

/// One incremental walk over the roots of `params`.
pub struct Walker<'a> {
    params: &'a CacheParams,
    fs: &'a dyn FileSystem,
    previous: &'a CacheDatabase,
    cancel: CancellationToken,
    counters: ScanCounters,
}

impl<'a> Walker<'a> {
    /// Creates a walker that reuses entries from `previous` where possible.
    pub fn new(
        params: &'a CacheParams,
        fs: &'a dyn FileSystem,
        previous: &'a CacheDatabase,
    ) -> Self {
        Self {
            params,
            fs,
            previous,
            cancel: CancellationToken::noop(),
            counters: ScanCounters::default(),
        }
    }

    /// Sets the cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Walks every root and returns the refreshed database.
    ///
    /// Returns `Ok(None)` if the walk was cancelled; the partial result is
    /// discarded. Fails with [`FinderError::FatalScan`] when a root cannot be
    /// stat'ed or listed.
    pub fn scan(&self) -> Result<Option<CacheDatabase>> {
        let _span = tracing::debug_span!("finder_scan").entered();
        let mut entries = Vec::new();
        for root in self.params.cleaned_roots() {
            match self.scan_root(root)? {
                Some(subtree) => entries.extend(subtree),
                None => {
                    tracing::debug!("finder scan cancelled");
                    return Ok(None);
                }
            }
        }

        let stats = self.stats();
        tracing::debug!(
            "finder scan finished: {} listed, {} reused, {} skipped, {} files",
            stats.dirs_listed,
            stats.dirs_reused,
            stats.dirs_skipped,
            stats.files_seen
        );

        Ok(Some(CacheDatabase::from_entries(
            self.params.fingerprint(),
            entries,
        )))
    }

    /// Returns a snapshot of the walk counters.
    pub fn stats(&self) -> ScanStats {
        ScanStats {
            dirs_listed: self.counters.dirs_listed.load(Ordering::Relaxed),
            dirs_reused: self.counters.dirs_reused.load(Ordering::Relaxed),
            dirs_skipped: self.counters.dirs_skipped.load(Ordering::Relaxed),
            files_seen: self.counters.files_seen.load(Ordering::Relaxed),
        }
    }

    fn scan_root(&self, root: String) -> Result<Option<Vec<DirectoryEntry>>> {
        if self.cancel.is_cancelled().is_none() {
            return Ok(None);
        }

        let stamp = self
            .fs
            .stat_dir(&root)
            .map_err(|error| FinderError::fatal_scan(&root, error.to_string()))?;
        let entry = match self.reuse(&root, &stamp) {
            Some(entry) => entry,
            None => self
                .list(root.clone(), stamp)
                .map_err(|error| FinderError::fatal_scan(&root, error.to_string()))?,
        };

        Ok(self.descend(entry))
    }

    /// Visits a non-root directory. Failures only skip this subtree.
    fn scan_dir(&self, path: String) -> Option<Vec<DirectoryEntry>> {
        self.cancel.is_cancelled()?;

        let visited = self.fs.stat_dir(&path).and_then(|stamp| match self.reuse(&path, &stamp) {
            Some(entry) => Ok(entry),
            None => self.list(path.clone(), stamp),
        });

        match visited {
            Ok(entry) => self.descend(entry),
            Err(error) => {
                self.counters.dirs_skipped.fetch_add(1, Ordering::Relaxed);
                if error.kind() == io::ErrorKind::NotFound {
                    tracing::debug!("directory {path} disappeared during scan");
                } else {
                    tracing::warn!("skipping unreadable directory {path}: {error}");
                }
                Some(Vec::new())
            }
        }
    }

    /// Returns the cached entry for `path` if it is still current.
    fn reuse(&self, path: &str, stamp: &DirStamp) -> Option<DirectoryEntry> {
        let cached = self.previous.get(path);
        if is_stale(cached, stamp) {
            return None;
        }
        self.counters.dirs_reused.fetch_add(1, Ordering::Relaxed);
        cached.cloned()
    }

    fn list(&self, path: String, stamp: DirStamp) -> io::Result<DirectoryEntry> {
        let children = self.fs.read_dir(&path)?;
        self.counters.dirs_listed.fetch_add(1, Ordering::Relaxed);
        Ok(DirectoryEntry::from_listing(
            path,
            stamp,
            children,
            self.params,
        ))
    }

    /// Walks the subdirectories of `entry` in parallel and returns `entry`
    /// followed by every entry below it, in listing order.
    fn descend(&self, entry: DirectoryEntry) -> Option<Vec<DirectoryEntry>> {
        self.counters
            .files_seen
            .fetch_add(entry.file_names.len(), Ordering::Relaxed);

        let subtrees: Vec<Option<Vec<DirectoryEntry>>> = entry
            .descendable_dirs()
            .par_iter()
            .map(|name| self.scan_dir(join_child(&entry.path, name)))
            .collect();

        let mut entries = vec![entry];
        for subtree in subtrees {
            entries.extend(subtree?);
        }
        Some(entries)
    }
}
