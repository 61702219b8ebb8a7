//! In-memory cache database.

use std::collections::BTreeMap;

use super::entry::DirectoryEntry;

/// Every known directory of a session, keyed by cleaned path, together with
/// the fingerprint of the rules it was built under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheDatabase {
    fingerprint: u64,
    entries: BTreeMap<String, DirectoryEntry>,
}

impl CacheDatabase {
    /// Creates an empty database for rules with the given fingerprint.
    pub fn empty(fingerprint: u64) -> Self {
        Self {
            fingerprint,
            entries: BTreeMap::new(),
        }
    }

    /// Creates a database from entries. A later entry for the same path
    /// replaces an earlier one.
    pub fn from_entries(
        fingerprint: u64,
        entries: impl IntoIterator<Item = DirectoryEntry>,
    ) -> Self {
        let mut database = Self::empty(fingerprint);
        for entry in entries {
            database.insert(entry);
        }
        database
    }

    #[inline]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    #[inline]
    pub fn get(&self, path: &str) -> Option<&DirectoryEntry> {
        self.entries.get(path)
    }

    /// Inserts an entry, returning the one it replaced.
    pub fn insert(&mut self, entry: DirectoryEntry) -> Option<DirectoryEntry> {
        self.entries.insert(entry.path.clone(), entry)
    }

    /// Entries in path order.
    pub fn entries(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<DirectoryEntry> {
        self.entries.into_values().collect()
    }
}
