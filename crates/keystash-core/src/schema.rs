//! Host schema boundary.
//!
//! The host object layer owns model definitions. The record store only
//! needs to ask three things of it: which relationships a model declares,
//! what each one points at, and which adapter persists a given model. Those
//! questions are the [`ModelSchema`] and [`SchemaRegistry`] traits.
//!
//! [`ModelDef`] and [`Schema`] are plain in-process implementations used by
//! the CLI, configuration bridge, and tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    /// The record holds the id of one related record.
    BelongsTo,
    /// One-to-one; stored like `BelongsTo`.
    HasOne,
    /// The record holds an ordered list of related ids.
    HasMany,
}

impl RelationshipKind {
    /// Whether the foreign key holds a single id.
    #[must_use]
    pub fn is_single(self) -> bool {
        matches!(self, Self::BelongsTo | Self::HasOne)
    }
}

/// One declared relationship of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    /// Relationship name; also the foreign-key field in the record hash.
    pub name: String,
    /// Cardinality.
    pub kind: RelationshipKind,
    /// Model name of the related records.
    pub related_type: String,
}

/// Relationship names grouped the way the host enumerates them.
///
/// `belongs_to` carries both `BelongsTo` and `HasOne` relationships.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipNames {
    /// Single-valued relationships, in declaration order.
    pub belongs_to: Vec<String>,
    /// Multi-valued relationships, in declaration order.
    pub has_many: Vec<String>,
}

impl RelationshipNames {
    /// All names: every single-valued one first, then every multi-valued one.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.belongs_to
            .iter()
            .chain(self.has_many.iter())
            .map(String::as_str)
    }
}

/// Identity of the adapter that persists a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdapterId(String);

impl AdapterId {
    /// Name of the adapter used when a model does not name one.
    pub const APPLICATION: &'static str = "application";

    /// Create an adapter id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The default application-wide adapter.
    #[must_use]
    pub fn application() -> Self {
        Self::new(Self::APPLICATION)
    }

    /// Adapter name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AdapterId {
    fn default() -> Self {
        Self::application()
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Schema of one model, as exposed by the host.
pub trait ModelSchema: Send + Sync + fmt::Debug {
    /// Model name (`"post"`).
    fn model_name(&self) -> &str;

    /// Optional storage namespace override.
    fn url(&self) -> Option<&str> {
        None
    }

    /// Declared relationship names.
    fn relationship_names(&self) -> RelationshipNames;

    /// Descriptor of the named relationship.
    fn relationship(&self, name: &str) -> Option<RelationshipDescriptor>;

    /// Key of this model's namespace inside the root document.
    fn namespace(&self) -> &str {
        self.url().unwrap_or_else(|| self.model_name())
    }
}

/// Lookup of models and their adapters.
pub trait SchemaRegistry: Send + Sync {
    /// Schema of the named model.
    fn model(&self, name: &str) -> Option<Arc<dyn ModelSchema>>;

    /// Adapter persisting the named model.
    fn adapter_for(&self, model_name: &str) -> AdapterId;
}

/// In-process model definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelDef {
    name: String,
    url: Option<String>,
    relationships: Vec<RelationshipDescriptor>,
}

impl ModelDef {
    /// Start a definition for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Store records under `url` instead of the model name.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Declare a relationship.
    #[must_use]
    pub fn with_relationship(
        mut self,
        name: impl Into<String>,
        kind: RelationshipKind,
        related_type: impl Into<String>,
    ) -> Self {
        self.relationships.push(RelationshipDescriptor {
            name: name.into(),
            kind,
            related_type: related_type.into(),
        });
        self
    }

    /// Declare a belongs-to relationship.
    #[must_use]
    pub fn belongs_to(self, name: impl Into<String>, related_type: impl Into<String>) -> Self {
        self.with_relationship(name, RelationshipKind::BelongsTo, related_type)
    }

    /// Declare a has-one relationship.
    #[must_use]
    pub fn has_one(self, name: impl Into<String>, related_type: impl Into<String>) -> Self {
        self.with_relationship(name, RelationshipKind::HasOne, related_type)
    }

    /// Declare a has-many relationship.
    #[must_use]
    pub fn has_many(self, name: impl Into<String>, related_type: impl Into<String>) -> Self {
        self.with_relationship(name, RelationshipKind::HasMany, related_type)
    }

    /// Declared relationships in declaration order.
    #[must_use]
    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }
}

impl ModelSchema for ModelDef {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn relationship_names(&self) -> RelationshipNames {
        let mut names = RelationshipNames::default();
        for rel in &self.relationships {
            if rel.kind.is_single() {
                names.belongs_to.push(rel.name.clone());
            } else {
                names.has_many.push(rel.name.clone());
            }
        }
        names
    }

    fn relationship(&self, name: &str) -> Option<RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name).cloned()
    }
}

/// In-process [`SchemaRegistry`].
///
/// Every model is persisted by the default adapter unless it was assigned
/// to another one with [`Schema::with_adapter`].
#[derive(Debug, Clone, Default)]
pub struct Schema {
    models: HashMap<String, Arc<ModelDef>>,
    adapters: HashMap<String, AdapterId>,
    default_adapter: AdapterId,
}

impl Schema {
    /// Empty schema whose models belong to the application adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model.
    #[must_use]
    pub fn with_model(mut self, def: ModelDef) -> Self {
        self.models.insert(def.name.clone(), Arc::new(def));
        self
    }

    /// Persist `model_name` with a different adapter.
    #[must_use]
    pub fn with_adapter(mut self, model_name: impl Into<String>, adapter: AdapterId) -> Self {
        self.adapters.insert(model_name.into(), adapter);
        self
    }

    /// Change the adapter used for models without an explicit assignment.
    #[must_use]
    pub fn with_default_adapter(mut self, adapter: AdapterId) -> Self {
        self.default_adapter = adapter;
        self
    }

    /// Registered model names, sorted.
    #[must_use]
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl SchemaRegistry for Schema {
    fn model(&self, name: &str) -> Option<Arc<dyn ModelSchema>> {
        self.models
            .get(name)
            .map(|def| Arc::clone(def) as Arc<dyn ModelSchema>)
    }

    fn adapter_for(&self, model_name: &str) -> AdapterId {
        self.adapters
            .get(model_name)
            .cloned()
            .unwrap_or_else(|| self.default_adapter.clone())
    }
}
