//! In-memory artifact store for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{normalize_key, under_prefix, ArtifactStore, StorageError, StorageResult};

/// Artifact store backed by a sorted map.
///
/// `replace` runs inside a single write lock, so concurrent readers never
/// observe a half-moved report.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ArtifactStore for MemoryStore {
    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let key = normalize_key(path)?;
        self.write_entries().insert(key, data.to_vec());
        Ok(())
    }

    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let key = normalize_key(path)?;
        self.read_entries()
            .get(&key)
            .cloned()
            .ok_or(StorageError::NotFound(key))
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        let key = normalize_key(path)?;
        Ok(self.read_entries().keys().any(|k| under_prefix(k, &key)))
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = normalize_key(prefix)?;
        Ok(self
            .read_entries()
            .keys()
            .filter(|k| under_prefix(k, &prefix))
            .cloned()
            .collect())
    }

    fn remove_all(&self, prefix: &str) -> StorageResult<()> {
        let prefix = normalize_key(prefix)?;
        self.write_entries().retain(|k, _| !under_prefix(k, &prefix));
        Ok(())
    }

    fn replace(&self, staging: &str, target: &str) -> StorageResult<()> {
        let staging = normalize_key(staging)?;
        let target = normalize_key(target)?;

        let mut entries = self.write_entries();
        let staged: Vec<String> = entries
            .keys()
            .filter(|k| under_prefix(k, &staging))
            .cloned()
            .collect();
        if staged.is_empty() {
            return Err(StorageError::NotFound(staging));
        }

        entries.retain(|k, _| !under_prefix(k, &target));
        for key in staged {
            if let Some(data) = entries.remove(&key) {
                let moved = format!("{}{}", target, &key[staging.len()..]);
                entries.insert(moved, data);
            }
        }
        Ok(())
    }
}
