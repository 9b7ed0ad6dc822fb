//! Store selection from configuration.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{ArtifactStore, LocalStore, MemoryStore, StorageError, StorageResult};

/// Artifact store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Directory on the local filesystem
    #[default]
    Local,
    /// Process-local map, discarded on exit
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    /// Parses `"local"` or `"memory"`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "memory" => Ok(Self::Memory),
            _ => Err(format!("Unknown store kind: {}", s)),
        }
    }
}

/// Creates artifact stores.
pub struct StoreFactory;

impl StoreFactory {
    /// Creates a store of the given kind.
    ///
    /// # Arguments
    /// * `kind` - backend to create
    /// * `root` - root directory, required for [`StoreKind::Local`]
    pub fn create(kind: StoreKind, root: Option<&Path>) -> StorageResult<Arc<dyn ArtifactStore>> {
        match kind {
            StoreKind::Local => {
                let root = root.ok_or_else(|| {
                    StorageError::Configuration("local store requires a root directory".to_string())
                })?;
                Ok(Arc::new(LocalStore::new(root)?))
            }
            StoreKind::Memory => Ok(Self::create_memory()),
        }
    }

    pub fn create_memory() -> Arc<dyn ArtifactStore> {
        Arc::new(MemoryStore::new())
    }
}
