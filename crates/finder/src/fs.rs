//! Filesystem access used by the walker.
//!
//! The walker only ever needs two operations: stat a directory to obtain its
//! staleness stamp, and list it. Keeping them behind a trait lets tests count
//! listings and inject failures.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

/// Staleness signal for a directory.
///
/// A directory's modification time changes whenever an entry is added,
/// removed or renamed inside it. Inode and device catch a directory that was
/// replaced by another one carrying the same timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirStamp {
    /// Modification time in nanoseconds since the Unix epoch.
    pub modified_nanos: u128,
    pub inode: u64,
    pub device: u64,
}

impl DirStamp {
    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        let modified_nanos = metadata
            .modified()
            .ok()
            .and_then(|value| value.duration_since(UNIX_EPOCH).ok())
            .map(|value| value.as_nanos())
            .unwrap_or(0);
        let (inode, device) = inode_and_device(metadata);
        Self {
            modified_nanos,
            inode,
            device,
        }
    }
}

#[cfg(unix)]
fn inode_and_device(metadata: &fs::Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (metadata.ino(), metadata.dev())
}

#[cfg(not(unix))]
fn inode_and_device(_metadata: &fs::Metadata) -> (u64, u64) {
    (0, 0)
}

/// Kind of a listed directory child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Dir,
    /// Regular files, symlinks and everything else that is not descended into.
    File,
}

/// One child returned by [`FileSystem::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirChild {
    pub name: String,
    pub kind: ChildKind,
}

impl DirChild {
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChildKind::Dir,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChildKind::File,
        }
    }
}

/// Directory access for the walker. Paths are cleaned and relative to the
/// session's working directory (or absolute).
pub trait FileSystem: Send + Sync {
    /// Returns the stamp of `path`, failing if it is not a directory.
    fn stat_dir(&self, path: &str) -> io::Result<DirStamp>;

    /// Lists the children of `path` in unspecified order.
    ///
    /// Children whose names are not valid UTF-8 cannot be reported as paths
    /// and are left out of the listing.
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirChild>>;
}

/// The real filesystem, resolved against an explicit working directory.
#[derive(Debug, Clone)]
pub struct OsFs {
    working_directory: PathBuf,
}

impl OsFs {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path == "." {
            self.working_directory.clone()
        } else {
            self.working_directory.join(Path::new(path))
        }
    }
}

impl FileSystem for OsFs {
    fn stat_dir(&self, path: &str) -> io::Result<DirStamp> {
        // Symlinks are never followed, so a link to a directory is not one.
        let metadata = fs::symlink_metadata(self.resolve(path))?;
        if !metadata.file_type().is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{path} is not a directory"),
            ));
        }
        Ok(DirStamp::from_metadata(&metadata))
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirChild>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!(
                        "skipping {:?} in {path}: name is not valid UTF-8",
                        raw
                    );
                    continue;
                }
            };
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(error) => {
                    tracing::debug!("skipping {name} in {path}: {error}");
                    continue;
                }
            };
            children.push(DirChild {
                name,
                kind: if file_type.is_dir() {
                    ChildKind::Dir
                } else {
                    ChildKind::File
                },
            });
        }
        Ok(children)
    }
}
