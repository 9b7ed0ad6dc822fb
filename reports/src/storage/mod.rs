//! Artifact storage.
//!
//! The report builder only needs a flat key/value view of storage: keys are
//! `/`-separated relative paths, values are byte blobs. `replace` is the one
//! operation with a visibility contract: after it returns, readers of the
//! target prefix see either the complete old report or the complete new
//! one.

mod factory;
mod local;
mod memory;

pub use factory::{StoreFactory, StoreKind};
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Key/value artifact storage.
pub trait ArtifactStore: Send + Sync {
    /// Writes `data` at `path`, creating or overwriting it.
    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Reads the blob at `path`.
    fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Keys at or below `prefix`, sorted.
    fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Removes every key at or below `prefix`. Missing prefixes are not an
    /// error.
    fn remove_all(&self, prefix: &str) -> StorageResult<()>;

    /// Moves everything below `staging` to `target`, discarding whatever
    /// `target` held before.
    fn replace(&self, staging: &str, target: &str) -> StorageResult<()>;
}

/// Validates a storage key and returns it without leading/trailing
/// separators noise.
///
/// Rejects empty keys, absolute paths, backslashes, and `.`/`..` or empty
/// segments.
pub fn normalize_key(path: &str) -> StorageResult<String> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(StorageError::InvalidPath("empty path".to_string()));
    }
    if trimmed.starts_with('/') || trimmed.contains('\\') {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    if trimmed
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Whether `key` is `prefix` itself or lies below it.
pub(crate) fn under_prefix(key: &str, prefix: &str) -> bool {
    key == prefix
        || (key.len() > prefix.len() && key.starts_with(prefix) && key.as_bytes()[prefix.len()] == b'/')
}
