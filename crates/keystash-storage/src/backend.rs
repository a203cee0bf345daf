//! Storage backend trait and the in-memory implementation.
//!
//! A backend is deliberately tiny: the record store above it reads one
//! string, parses it, mutates it, and writes the whole string back. There
//! is no listing, deleting, or range scanning at this layer.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

/// Validate that a key is safe for storage.
///
/// Keys must be non-empty and must not contain the null byte.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// String key-value storage medium.
///
/// Writes replace the previous value atomically from the caller's point of
/// view; a reader never observes a half-written value.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name used in logs and events.
    fn name(&self) -> &'static str;

    /// Get the value stored under `key`.
    ///
    /// Returns `None` if nothing has been stored yet.
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: String) -> StorageResult<()>;

    /// Flush and release the medium.
    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// In-memory storage for tests, ephemeral data, and the fallback path.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the lock is poisoned.
    pub fn len(&self) -> StorageResult<usize> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.len())
    }

    /// Whether no key has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the lock is poisoned.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        validate_key(key)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        validate_key(key)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        data.insert(key.to_owned(), value);
        Ok(())
    }
}
