//! Filesystem artifact store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::{normalize_key, ArtifactStore, StorageError, StorageResult};

/// Artifact store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Creates the store, creating `root` if needed.
    pub fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError::io(root.display().to_string(), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StorageResult<(String, PathBuf)> {
        let key = normalize_key(path)?;
        let full = key.split('/').fold(self.root.clone(), |acc, segment| acc.join(segment));
        Ok((key, full))
    }

    fn collect_files(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> StorageResult<()> {
        let entries = fs::read_dir(dir).map_err(|e| StorageError::io(dir.display().to_string(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(dir.display().to_string(), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = format!("{}/{}", prefix, name);
            let path = entry.path();
            if path.is_dir() {
                self.collect_files(&path, &key, out)?;
            } else {
                out.push(key);
            }
        }
        Ok(())
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

impl ArtifactStore for LocalStore {
    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let (key, full) = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(key.clone(), e))?;
        }
        fs::write(&full, data).map_err(|e| StorageError::io(key, e))
    }

    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let (key, full) = self.resolve(path)?;
        fs::read(&full).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key),
            _ => StorageError::io(key, e),
        })
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        let (key, full) = self.resolve(path)?;
        full.try_exists().map_err(|e| StorageError::io(key, e))
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let (key, full) = self.resolve(prefix)?;
        let mut keys = Vec::new();
        if full.is_dir() {
            self.collect_files(&full, &key, &mut keys)?;
        } else if full.is_file() {
            keys.push(key);
        }
        keys.sort();
        Ok(keys)
    }

    fn remove_all(&self, prefix: &str) -> StorageResult<()> {
        let (key, full) = self.resolve(prefix)?;
        remove_path(&full).map_err(|e| StorageError::io(key, e))
    }

    /// Renames the old target aside, renames staging into place, then
    /// deletes the old copy. If the second rename fails the old target is
    /// restored.
    fn replace(&self, staging: &str, target: &str) -> StorageResult<()> {
        let (staging_key, staging_path) = self.resolve(staging)?;
        let (target_key, target_path) = self.resolve(target)?;

        if !staging_path.exists() {
            return Err(StorageError::NotFound(staging_key));
        }
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(target_key.clone(), e))?;
        }

        let name = target_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let backup = target_path.with_file_name(format!(".{}.previous", name));
        remove_path(&backup).map_err(|e| StorageError::io(target_key.clone(), e))?;

        let had_previous = target_path.exists();
        if had_previous {
            fs::rename(&target_path, &backup).map_err(|e| StorageError::io(target_key.clone(), e))?;
        }

        if let Err(e) = fs::rename(&staging_path, &target_path) {
            if had_previous {
                if let Err(restore) = fs::rename(&backup, &target_path) {
                    warn!(
                        "failed to restore previous report at {}: {}",
                        target_key, restore
                    );
                }
            }
            return Err(StorageError::io(target_key, e));
        }

        if had_previous {
            if let Err(e) = remove_path(&backup) {
                // The new report is already in place.
                warn!("failed to remove previous report copy {}: {}", backup.display(), e);
            } else {
                debug!("removed previous report copy {}", backup.display());
            }
        }
        Ok(())
    }
}
