//! Traversal rules for a finder session.

use std::hash::Hasher;
use std::path::{Component, Path, PathBuf};

use fnv::FnvHasher;
use serde::{Deserialize, Serialize};

/// Immutable configuration of one finder session.
///
/// Every path the finder reports is relative to `working_directory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheParams {
    /// Directory that root directories and reported paths are relative to.
    pub working_directory: PathBuf,
    /// Directories to scan, relative to the working directory.
    pub root_dirs: Vec<String>,
    /// Directory names skipped entirely, including everything below them.
    pub exclude_dirs: Vec<String>,
    /// File names whose presence stops recursion below their directory.
    pub prune_files: Vec<String>,
    /// File names that named queries are allowed to look for.
    pub include_files: Vec<String>,
}

impl CacheParams {
    /// Creates params scanning the whole working directory with no rules.
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            root_dirs: vec![".".to_string()],
            exclude_dirs: Vec::new(),
            prune_files: Vec::new(),
            include_files: Vec::new(),
        }
    }

    pub fn with_root_dirs<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.root_dirs = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exclude_dirs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dirs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prune_files<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prune_files = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_include_files<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_files = names.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn is_excluded(&self, dir_name: &str) -> bool {
        self.exclude_dirs.iter().any(|name| name == dir_name)
    }

    #[inline]
    pub fn is_prune_marker(&self, file_name: &str) -> bool {
        self.prune_files.iter().any(|name| name == file_name)
    }

    /// Returns true if named queries may look for `file_name`.
    ///
    /// An empty include set allows every name.
    pub fn is_included(&self, file_name: &str) -> bool {
        self.include_files.is_empty() || self.include_files.iter().any(|name| name == file_name)
    }

    /// Root directories in cleaned form, duplicates removed, order kept.
    pub fn cleaned_roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = Vec::with_capacity(self.root_dirs.len());
        for root in &self.root_dirs {
            let cleaned = clean_path(Path::new(root));
            if !roots.contains(&cleaned) {
                roots.push(cleaned);
            }
        }
        roots
    }

    /// Fingerprint of every rule that shapes the stored tree.
    ///
    /// Include files only affect queries, so they are not part of it.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FnvHasher::default();
        hasher.write(self.working_directory.to_string_lossy().as_bytes());
        hasher.write_u8(0xff);
        for (list, separator) in [
            (self.cleaned_roots(), 0xfe),
            (sorted_unique(&self.exclude_dirs), 0xfd),
            (sorted_unique(&self.prune_files), 0xfc),
        ] {
            for item in list {
                hasher.write(item.as_bytes());
                hasher.write_u8(separator);
            }
            hasher.write_u8(0xff);
        }
        hasher.finish()
    }
}

fn sorted_unique(items: &[String]) -> Vec<String> {
    let mut items = items.to_vec();
    items.sort();
    items.dedup();
    items
}

/// Lexically cleans a path into the form used as a database key.
///
/// `"./a/../b/"` becomes `"b"`, the empty path and `"./"` become `"."`.
pub fn clean_path(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut absolute = false;
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => {
                parts.push(prefix.as_os_str().to_string_lossy().into_owned())
            }
            Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push("..".to_string()),
            },
            Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Joins a child name onto a cleaned directory path.
pub fn join_child(dir: &str, name: &str) -> String {
    match dir {
        "." => name.to_string(),
        "/" => format!("/{name}"),
        _ => format!("{dir}/{name}"),
    }
}
