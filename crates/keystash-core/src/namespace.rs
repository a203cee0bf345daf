//! Per-model namespaces inside the single root document.
//!
//! All models share one storage key. Its value is a JSON object mapping each
//! model namespace to `{ "records": { "<id>": <record hash> } }`. Every write
//! re-reads the root document, replaces one namespace entry, and writes the
//! whole document back.

use std::collections::BTreeMap;
use std::sync::Arc;

use keystash_events::{EventMetadata, StashEvent};
use keystash_storage::StorageHandle;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{StashError, StashResult};
use crate::record::RecordHash;

/// Record collection of one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    /// Records keyed by id.
    #[serde(default)]
    pub records: BTreeMap<String, RecordHash>,
}

impl Namespace {
    /// Record stored under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RecordHash> {
        self.records.get(id)
    }

    /// Store `record` under `id`, replacing any previous record.
    pub fn insert(&mut self, id: impl Into<String>, record: RecordHash) {
        self.records.insert(id.into(), record);
    }

    /// Remove the record stored under `id`.
    pub fn remove(&mut self, id: &str) -> Option<RecordHash> {
        self.records.remove(id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the namespace holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in namespace iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &RecordHash> {
        self.records.values()
    }
}

/// Reads and writes namespaces through a [`StorageHandle`].
#[derive(Debug, Clone)]
pub struct NamespaceStore {
    storage: Arc<StorageHandle>,
    root_key: String,
}

impl NamespaceStore {
    /// Store keeping its root document under `root_key`.
    #[must_use]
    pub fn new(storage: Arc<StorageHandle>, root_key: impl Into<String>) -> Self {
        Self {
            storage,
            root_key: root_key.into(),
        }
    }

    /// Storage key of the root document.
    #[must_use]
    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    /// The underlying storage handle.
    #[must_use]
    pub fn storage(&self) -> &Arc<StorageHandle> {
        &self.storage
    }

    /// Load the root document. A missing or blank value is an empty document.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::Serialization`] if the stored value is not a
    /// JSON object, or a storage error if the read fails.
    pub async fn load(&self) -> StashResult<Map<String, Value>> {
        let Some(raw) = self.storage.get_item(&self.root_key).await? else {
            return Ok(Map::new());
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&raw)? {
            Value::Object(root) => Ok(root),
            other => Err(StashError::Serialization(format!(
                "root document under '{}' is not an object: {other}",
                self.root_key
            ))),
        }
    }

    /// Namespace of one model; empty when the document has no entry for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the root document cannot be loaded or the entry
    /// is malformed.
    pub async fn namespace_for(&self, namespace: &str) -> StashResult<Namespace> {
        let mut root = self.load().await?;
        match root.remove(namespace) {
            Some(entry) => Ok(serde_json::from_value(entry)?),
            None => Ok(Namespace::default()),
        }
    }

    /// Replace one namespace entry and write the whole root document back.
    ///
    /// # Errors
    ///
    /// Returns an error if the root document cannot be loaded, encoded, or
    /// written.
    pub async fn persist(&self, namespace: &str, data: &Namespace) -> StashResult<()> {
        let mut root = self.load().await?;
        root.insert(namespace.to_owned(), serde_json::to_value(data)?);

        let encoded = serde_json::to_string(&Value::Object(root))?;
        self.storage.set_item(&self.root_key, encoded).await?;

        debug!(
            namespace,
            records = data.len(),
            root_key = %self.root_key,
            "namespace persisted"
        );
        self.storage.events().publish(StashEvent::NamespacePersisted {
            metadata: EventMetadata::new("namespace"),
            namespace: namespace.to_owned(),
            records: data.len(),
        });
        Ok(())
    }
}
