//! Persistent storage backed by `SurrealKV`.
//!
//! ACID-compliant, versioned, embedded LSM-tree storage. Keys are stored as
//! their UTF-8 bytes and values as UTF-8 JSON text.

use async_trait::async_trait;
use tracing::info;

use crate::backend::{StorageBackend, validate_key};
use crate::error::{StorageError, StorageResult};

/// Persistent storage backed by a `SurrealKV` tree.
pub struct SurrealKvBackend {
    tree: surrealkv::Tree,
}

impl std::fmt::Debug for SurrealKvBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealKvBackend").finish_non_exhaustive()
    }
}

impl SurrealKvBackend {
    /// Open a persistent store at the given directory path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the store cannot be opened.
    pub fn open(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        let tree = surrealkv::TreeBuilder::new()
            .with_path(path.as_ref().to_path_buf())
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        info!(path = %path.as_ref().display(), "opened surrealkv storage");
        Ok(Self { tree })
    }
}

fn map_kv_err(e: &surrealkv::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

#[async_trait]
impl StorageBackend for SurrealKvBackend {
    fn name(&self) -> &'static str {
        "surrealkv"
    }

    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        validate_key(key)?;
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| map_kv_err(e))?;
        let raw = tx.get(key.as_bytes()).map_err(|ref e| map_kv_err(e))?;
        raw.map(|bytes| {
            String::from_utf8(bytes.to_vec())
                .map_err(|e| StorageError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        validate_key(key)?;
        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        tx.set(key.as_bytes(), value.as_bytes())
            .map_err(|ref e| map_kv_err(e))?;
        tx.commit().await.map_err(|ref e| map_kv_err(e))
    }

    async fn close(&self) -> StorageResult<()> {
        self.tree.close().await.map_err(|ref e| map_kv_err(e))
    }
}
