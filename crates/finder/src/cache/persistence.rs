//! Cache persistence - database read/write operations.
//!
//! The database is stored as postcard inside a zstd stream. Writes go to a
//! temp file in the destination directory which is then renamed over the
//! cache file, so a crash mid-write leaves the previous snapshot intact.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread::available_parallelism;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::database::CacheDatabase;
use super::entry::DirectoryEntry;
use crate::error::{FinderError, Result};
use crate::params::CacheParams;

/// Cache format version - increment when changing the format.
pub const FINDER_CACHE_VERSION: u32 = 1;

/// On-disk form of a [`CacheDatabase`].
#[derive(Serialize, Deserialize)]
struct PersistentDatabase {
    version: u32,
    fingerprint: u64,
    /// Rules the snapshot was built under, kept for diagnostics.
    params: CacheParams,
    saved_at: u64,
    entries: Vec<DirectoryEntry>,
}

/// Loads the database at `location` for a session configured with `params`.
///
/// A missing file, a different format version or a different rules
/// fingerprint all yield an empty database. A file that exists but cannot
/// be read or decoded is an error.
pub fn load(location: &Path, params: &CacheParams) -> Result<CacheDatabase> {
    let fingerprint = params.fingerprint();
    let input = match File::open(location) {
        Ok(file) => file,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::debug!("no finder cache at {}", location.display());
            return Ok(CacheDatabase::empty(fingerprint));
        }
        Err(error) => return Err(FinderError::io("open finder cache", location, error)),
    };

    let decoder = zstd::Decoder::new(input).map_err(|error| decode_error(location, error))?;
    let mut input = BufReader::new(decoder);
    let mut scratch = vec![0u8; 4 * 1024];

    let storage: PersistentDatabase = {
        let _span = tracing::debug_span!("cache_decode", path = %location.display()).entered();
        postcard::from_io((&mut input, &mut scratch))
            .map(|(storage, _)| storage)
            .map_err(|error| decode_error(location, error))?
    };

    if storage.version != FINDER_CACHE_VERSION {
        tracing::debug!(
            "cache version mismatch: {} != {}",
            storage.version,
            FINDER_CACHE_VERSION
        );
        return Ok(CacheDatabase::empty(fingerprint));
    }

    if storage.fingerprint != fingerprint {
        tracing::debug!(
            "cache rules changed since last scan: {:016x} != {:016x}",
            storage.fingerprint,
            fingerprint
        );
        return Ok(CacheDatabase::empty(fingerprint));
    }

    tracing::debug!(
        "loaded finder cache from {} ({} directories, saved_at={})",
        location.display(),
        storage.entries.len(),
        storage.saved_at
    );

    Ok(CacheDatabase::from_entries(fingerprint, storage.entries))
}

/// Writes `database` to `location`, replacing any previous snapshot.
pub fn save(database: &CacheDatabase, params: &CacheParams, location: &Path) -> Result<()> {
    let storage = PersistentDatabase {
        version: FINDER_CACHE_VERSION,
        fingerprint: database.fingerprint(),
        params: params.clone(),
        saved_at: unix_now_secs(),
        entries: database.clone().into_entries(),
    };

    let parent = cache_parent(location);
    fs::create_dir_all(&parent)
        .map_err(|error| FinderError::io("create finder cache directory", &parent, error))?;

    let temp = NamedTempFile::new_in(&parent)
        .map_err(|error| FinderError::io("create temporary cache file in", &parent, error))?;

    {
        let mut encoder = zstd::Encoder::new(temp.as_file(), 6)
            .map_err(|error| FinderError::io("compress finder cache", location, error))?;

        let threads = available_parallelism().map(|x| x.get() as u32).unwrap_or(4);
        encoder
            .multithread(threads)
            .map_err(|error| FinderError::io("compress finder cache", location, error))?;

        let mut output = BufWriter::new(encoder);
        postcard::to_io(&storage, &mut output).map_err(|error| {
            FinderError::io(
                "encode finder cache",
                location,
                std::io::Error::new(ErrorKind::InvalidData, error),
            )
        })?;
        let encoder = output
            .into_inner()
            .map_err(|error| FinderError::io("write finder cache", location, error.into_error()))?;
        encoder
            .finish()
            .and_then(|mut file| file.flush())
            .map_err(|error| FinderError::io("write finder cache", location, error))?;
    }

    temp.persist(location)
        .map_err(|error| FinderError::io("replace finder cache", location, error.error))?;

    tracing::debug!(
        "wrote finder cache to {} ({} directories)",
        location.display(),
        database.len()
    );

    Ok(())
}

fn cache_parent(location: &Path) -> PathBuf {
    match location.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn decode_error(location: &Path, error: impl std::fmt::Display) -> FinderError {
    FinderError::CacheDecode {
        path: location.to_path_buf(),
        reason: error.to_string(),
    }
}

/// Returns the current Unix timestamp in seconds.
fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_secs())
        .unwrap_or(0)
}
