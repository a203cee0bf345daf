//! The local adapter: persistence verbs over per-model namespaces.

use std::sync::Arc;

use keystash_storage::StorageHandle;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{StashError, StashResult};
use crate::ids::generate_id;
use crate::namespace::{Namespace, NamespaceStore};
use crate::query::Query;
use crate::record::{Payload, RecordHash};
use crate::schema::{AdapterId, ModelSchema, SchemaRegistry};
use crate::serializer::{HostSerializer, JsonSerializer, Snapshot};

/// Root storage key used when none is configured.
pub const DEFAULT_ROOT_KEY: &str = "DS.LSAdapter";

/// Construction options for [`LocalAdapter`].
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// Identity compared against the schema's adapter assignments.
    pub id: AdapterId,
    /// Storage key of the root document.
    pub root_key: String,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            id: AdapterId::application(),
            root_key: DEFAULT_ROOT_KEY.to_owned(),
        }
    }
}

impl AdapterOptions {
    /// Use a different root key.
    #[must_use]
    pub fn with_root_key(mut self, root_key: impl Into<String>) -> Self {
        self.root_key = root_key.into();
        self
    }

    /// Use a different adapter identity.
    #[must_use]
    pub fn with_id(mut self, id: AdapterId) -> Self {
        self.id = id;
        self
    }
}

/// Per-call options of the find verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Embed related records. Nested fetches never embed further.
    pub allow_recursive: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            allow_recursive: true,
        }
    }
}

impl FindOptions {
    /// Fetch records without embedding anything.
    #[must_use]
    pub fn flat() -> Self {
        Self {
            allow_recursive: false,
        }
    }
}

/// Adapter persisting every record of its models as JSON inside one
/// key-value entry.
pub struct LocalAdapter {
    id: AdapterId,
    store: NamespaceStore,
    schema: Arc<dyn SchemaRegistry>,
    serializer: Arc<dyn HostSerializer>,
}

impl std::fmt::Debug for LocalAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAdapter")
            .field("id", &self.id)
            .field("root_key", &self.store.root_key())
            .finish_non_exhaustive()
    }
}

impl LocalAdapter {
    /// Create an adapter over `storage` using the stock serializer.
    #[must_use]
    pub fn new(
        storage: Arc<StorageHandle>,
        schema: Arc<dyn SchemaRegistry>,
        options: AdapterOptions,
    ) -> Self {
        info!(adapter = %options.id, root_key = %options.root_key, "local adapter created");
        Self {
            id: options.id,
            store: NamespaceStore::new(storage, options.root_key),
            schema,
            serializer: Arc::new(JsonSerializer),
        }
    }

    /// Replace the host serializer.
    #[must_use]
    pub fn with_serializer(mut self, serializer: Arc<dyn HostSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Adapter identity.
    #[must_use]
    pub fn id(&self) -> &AdapterId {
        &self.id
    }

    /// Namespace storage.
    #[must_use]
    pub fn store(&self) -> &NamespaceStore {
        &self.store
    }

    /// Host schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<dyn SchemaRegistry> {
        &self.schema
    }

    /// Host serializer.
    #[must_use]
    pub fn serializer(&self) -> &Arc<dyn HostSerializer> {
        &self.serializer
    }

    /// Schema of the named model.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::UnknownModel`] if the schema does not declare it.
    pub fn model(&self, model_name: &str) -> StashResult<Arc<dyn ModelSchema>> {
        self.schema
            .model(model_name)
            .ok_or_else(|| StashError::UnknownModel(model_name.to_owned()))
    }

    /// Namespace key of the named model.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::UnknownModel`] if the schema does not declare it.
    pub fn model_namespace(&self, model_name: &str) -> StashResult<String> {
        Ok(self.model(model_name)?.namespace().to_owned())
    }

    /// The whole root document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or decoded.
    pub async fn load_data(&self) -> StashResult<Map<String, Value>> {
        self.store.load().await
    }

    /// Replace a model's namespace and write the whole root document back.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is unknown or the write fails.
    pub async fn persist_data(&self, model_name: &str, namespace: &Namespace) -> StashResult<()> {
        let model = self.model(model_name)?;
        self.store.persist(model.namespace(), namespace).await
    }

    /// A fresh random record id.
    #[must_use]
    pub fn generate_id_for_record(&self) -> String {
        generate_id()
    }

    /// Fetch one record, embedding its same-adapter relationships when
    /// `options.allow_recursive` is set.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::NotFound`] if the id is not stored, or the first
    /// error raised while resolving relationships.
    pub async fn find_record(
        &self,
        model_name: &str,
        id: &str,
        options: FindOptions,
    ) -> StashResult<Payload> {
        let model = self.model(model_name)?;
        let record = self.fetch_record(model.as_ref(), id).await?;
        self.resolve(model.as_ref(), record, options.allow_recursive)
            .await
    }

    /// Fetch several records in the order of `ids`. One missing id fails the
    /// whole call.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::BatchNotFound`] naming the first missing id, or
    /// the first error raised while resolving relationships.
    pub async fn find_many<S>(
        &self,
        model_name: &str,
        ids: &[S],
        options: FindOptions,
    ) -> StashResult<Vec<Payload>>
    where
        S: AsRef<str> + Sync,
    {
        let model = self.model(model_name)?;
        let records = self.fetch_many(model.as_ref(), ids).await?;
        self.resolve_many(model.as_ref(), records, options.allow_recursive)
            .await
    }

    /// Records satisfying every criterion of `query`, with relationships
    /// embedded.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::NoMatch`] when nothing matches, or the first
    /// error raised while resolving relationships.
    pub async fn query(&self, model_name: &str, query: &Query) -> StashResult<Vec<Payload>> {
        let model = self.model(model_name)?;
        let namespace = self.store.namespace_for(model.namespace()).await?;
        let matched = query.filter(&namespace);
        debug!(model = model_name, matched = matched.len(), "query evaluated");
        if matched.is_empty() {
            return Err(StashError::NoMatch {
                model: model_name.to_owned(),
            });
        }
        self.resolve_many(model.as_ref(), matched, true).await
    }

    /// Older name of [`query`](Self::query).
    ///
    /// # Errors
    ///
    /// Same as [`query`](Self::query).
    #[deprecated(note = "use `query`")]
    pub async fn find_query(&self, model_name: &str, query: &Query) -> StashResult<Vec<Payload>> {
        warn!(model = model_name, "find_query is deprecated, use query");
        self.query(model_name, query).await
    }

    /// Copies of every record of a model. Relationships are not embedded.
    ///
    /// # Errors
    ///
    /// Returns an error if the root document cannot be read.
    pub async fn find_all(&self, model_name: &str) -> StashResult<Vec<RecordHash>> {
        let model = self.model(model_name)?;
        let namespace = self.store.namespace_for(model.namespace()).await?;
        Ok(namespace.iter().cloned().collect())
    }

    /// Store a new record. An id is generated when the snapshot lacks one.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn create_record(&self, snapshot: &Snapshot) -> StashResult<RecordHash> {
        let mut snapshot = snapshot.clone();
        if snapshot.id.as_deref().is_none_or(str::is_empty) {
            snapshot.id = Some(self.generate_id_for_record());
        }
        self.write_record(&snapshot).await
    }

    /// Replace a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::InvalidRecord`] if the snapshot has no id, or an
    /// error if serialization or the write fails.
    pub async fn update_record(&self, snapshot: &Snapshot) -> StashResult<RecordHash> {
        if snapshot.id.as_deref().is_none_or(str::is_empty) {
            return Err(StashError::InvalidRecord(format!(
                "cannot update a '{}' record without an id",
                snapshot.model
            )));
        }
        self.write_record(snapshot).await
    }

    /// Remove a record. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the root document cannot be read or written.
    pub async fn delete_record(&self, model_name: &str, id: &str) -> StashResult<bool> {
        let model = self.model(model_name)?;
        let mut namespace = self.store.namespace_for(model.namespace()).await?;
        let existed = namespace.remove(id).is_some();
        self.store.persist(model.namespace(), &namespace).await?;
        debug!(model = model_name, id, existed, "record deleted");
        Ok(existed)
    }

    async fn write_record(&self, snapshot: &Snapshot) -> StashResult<RecordHash> {
        let model = self.model(&snapshot.model)?;
        let record = self
            .serializer
            .serialize(model.as_ref(), snapshot, true)?;
        let id = record.id().ok_or_else(|| {
            StashError::InvalidRecord(format!(
                "serialized '{}' record has no id",
                snapshot.model
            ))
        })?;

        let mut namespace = self.store.namespace_for(model.namespace()).await?;
        namespace.insert(id.clone(), record.clone());
        self.store.persist(model.namespace(), &namespace).await?;
        debug!(model = %snapshot.model, id = %id, "record written");
        Ok(record)
    }

    /// One stored record, without relationship resolution.
    pub(crate) async fn fetch_record(
        &self,
        model: &dyn ModelSchema,
        id: &str,
    ) -> StashResult<RecordHash> {
        let namespace = self.store.namespace_for(model.namespace()).await?;
        lookup(&namespace, id).ok_or_else(|| StashError::NotFound {
            model: model.model_name().to_owned(),
            id: id.to_owned(),
        })
    }

    /// Several stored records from a single namespace read, without
    /// relationship resolution.
    pub(crate) async fn fetch_many<S>(
        &self,
        model: &dyn ModelSchema,
        ids: &[S],
    ) -> StashResult<Vec<RecordHash>>
    where
        S: AsRef<str> + Sync,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let namespace = self.store.namespace_for(model.namespace()).await?;
        ids.iter()
            .map(|id| {
                let id = id.as_ref();
                lookup(&namespace, id).ok_or_else(|| StashError::BatchNotFound {
                    model: model.model_name().to_owned(),
                    id: id.to_owned(),
                })
            })
            .collect()
    }
}

fn lookup(namespace: &Namespace, id: &str) -> Option<RecordHash> {
    namespace
        .get(id)
        .filter(|record| record.get("id").is_some())
        .cloned()
}
