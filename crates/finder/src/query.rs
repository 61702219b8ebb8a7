//! Read-only queries over a scanned database.
//!
//! All queries walk depth-first from a start directory: a directory's own
//! matches come first, then the matches of each subdirectory in listing
//! order. Sibling subtrees are searched in parallel and concatenated, so the
//! order never depends on scheduling. Pruned directories expose no
//! subdirectories.

use std::collections::HashSet;

use rayon::prelude::*;

use crate::cache::{CacheDatabase, DirectoryEntry};
use crate::params::join_child;

/// What a [`find_matching`] predicate sees for one directory.
#[derive(Debug, Clone, Copy)]
pub struct DirView<'a> {
    pub path: &'a str,
    pub dir_names: &'a [String],
    pub file_names: &'a [String],
}

impl<'a> DirView<'a> {
    fn of(entry: &'a DirectoryEntry) -> Self {
        Self {
            path: &entry.path,
            dir_names: entry.descendable_dirs(),
            file_names: &entry.file_names,
        }
    }
}

/// A predicate's answer for one directory: which subdirectories to visit
/// and which files to report. Names not present in the directory are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirMatches {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

impl DirMatches {
    pub fn new(dirs: Vec<String>, files: Vec<String>) -> Self {
        Self { dirs, files }
    }

    /// Visits every subdirectory and reports the given files.
    pub fn descend_all(view: &DirView<'_>, files: Vec<String>) -> Self {
        Self {
            dirs: view.dir_names.to_vec(),
            files,
        }
    }
}

/// Reports `<dir>/<name>` for each directory containing `name`, without
/// looking below a directory that matched.
pub fn find_first_named_at(database: &CacheDatabase, start: &str, name: &str) -> Vec<String> {
    let Some(entry) = database.get(start) else {
        return Vec::new();
    };
    if entry.has_file(name) {
        return vec![join_child(start, name)];
    }

    entry
        .descendable_dirs()
        .par_iter()
        .map(|dir| find_first_named_at(database, &join_child(start, dir), name))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

/// Reports `<dir>/<name>` for every directory containing `name`.
pub fn find_named_at(database: &CacheDatabase, start: &str, name: &str) -> Vec<String> {
    let Some(entry) = database.get(start) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    if entry.has_file(name) {
        results.push(join_child(start, name));
    }
    let nested: Vec<Vec<String>> = entry
        .descendable_dirs()
        .par_iter()
        .map(|dir| find_named_at(database, &join_child(start, dir), name))
        .collect();
    results.extend(nested.into_iter().flatten());
    results
}

/// Lets `predicate` choose, per directory, which files match and which
/// subdirectories to continue into.
pub fn find_matching<F>(database: &CacheDatabase, start: &str, predicate: &F) -> Vec<String>
where
    F: Fn(&DirView<'_>) -> DirMatches + Sync,
{
    let Some(entry) = database.get(start) else {
        return Vec::new();
    };

    let view = DirView::of(entry);
    let matches = predicate(&view);
    let files: HashSet<&str> = matches.files.iter().map(String::as_str).collect();
    let dirs: HashSet<&str> = matches.dirs.iter().map(String::as_str).collect();

    let mut results: Vec<String> = view
        .file_names
        .iter()
        .filter(|file| files.contains(file.as_str()))
        .map(|file| join_child(start, file))
        .collect();

    let nested: Vec<Vec<String>> = view
        .dir_names
        .par_iter()
        .filter(|dir| dirs.contains(dir.as_str()))
        .map(|dir| find_matching(database, &join_child(start, dir), predicate))
        .collect();
    results.extend(nested.into_iter().flatten());
    results
}

/// Reports every file below `start`.
pub fn find_all_at(database: &CacheDatabase, start: &str) -> Vec<String> {
    find_matching(database, start, &|view: &DirView<'_>| {
        DirMatches::descend_all(view, view.file_names.to_vec())
    })
}
