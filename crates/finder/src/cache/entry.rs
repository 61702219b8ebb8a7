//! A single scanned directory.

use serde::{Deserialize, Serialize};

use crate::fs::{ChildKind, DirChild, DirStamp};
use crate::params::CacheParams;

/// The stored listing of one directory.
///
/// Child names are sorted and unique. File names are the complete listing;
/// directory names omit excluded directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Cleaned path relative to the working directory (`"."` for itself).
    pub path: String,
    pub dir_names: Vec<String>,
    pub file_names: Vec<String>,
    pub stamp: DirStamp,
    /// True when the directory contains a prune marker; nothing below it
    /// is scanned or queried.
    pub pruned: bool,
}

impl DirectoryEntry {
    /// Builds an entry from a fresh listing, applying the exclude and prune
    /// rules of `params`.
    pub fn from_listing(
        path: String,
        stamp: DirStamp,
        children: Vec<DirChild>,
        params: &CacheParams,
    ) -> Self {
        let mut dir_names = Vec::new();
        let mut file_names = Vec::new();
        for child in children {
            match child.kind {
                ChildKind::Dir if params.is_excluded(&child.name) => {}
                ChildKind::Dir => dir_names.push(child.name),
                ChildKind::File => file_names.push(child.name),
            }
        }
        dir_names.sort_unstable();
        dir_names.dedup();
        file_names.sort_unstable();
        file_names.dedup();

        let pruned = file_names.iter().any(|name| params.is_prune_marker(name));
        Self {
            path,
            dir_names,
            file_names,
            stamp,
            pruned,
        }
    }

    /// Subdirectories that traversal may enter.
    #[inline]
    pub fn descendable_dirs(&self) -> &[String] {
        if self.pruned {
            &[]
        } else {
            &self.dir_names
        }
    }

    #[inline]
    pub fn has_file(&self, name: &str) -> bool {
        self.file_names
            .binary_search_by(|candidate| candidate.as_str().cmp(name))
            .is_ok()
    }
}

/// Returns true if `cached` no longer reflects a directory whose current
/// stamp is `live`. A missing entry is always stale.
pub fn is_stale(cached: Option<&DirectoryEntry>, live: &DirStamp) -> bool {
    match cached {
        Some(entry) => entry.stamp != *live,
        None => true,
    }
}
