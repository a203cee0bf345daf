//! Host serializer boundary: record snapshots in, normalized resources out.
//!
//! The host object layer decides how a live record becomes a [`RecordHash`]
//! and how a stored hash becomes the shape its identity map consumes. The
//! store reaches both directions through [`HostSerializer`]. [`JsonSerializer`]
//! is the stock implementation and normalizes into JSON:API-style resources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StashError, StashResult};
use crate::record::{RecordHash, id_string, is_truthy};
use crate::schema::{ModelSchema, RelationshipKind};

/// Host-side view of one record about to be written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Model name.
    pub model: String,
    /// Record id, if already assigned.
    pub id: Option<String>,
    /// Plain attributes.
    pub attributes: Map<String, Value>,
    /// Single-valued relationship ids.
    pub belongs_to: BTreeMap<String, Option<String>>,
    /// Multi-valued relationship ids.
    pub has_many: BTreeMap<String, Vec<String>>,
}

impl Snapshot {
    /// Snapshot of a new `model` record.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set a single-valued relationship.
    #[must_use]
    pub fn belongs_to(mut self, name: impl Into<String>, id: Option<&str>) -> Self {
        self.belongs_to.insert(name.into(), id.map(str::to_owned));
        self
    }

    /// Set a multi-valued relationship.
    #[must_use]
    pub fn has_many<I, S>(mut self, name: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.has_many
            .insert(name.into(), ids.into_iter().map(Into::into).collect());
        self
    }

    /// Split a raw record hash into a snapshot using the model's
    /// relationship declarations.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::InvalidRecord`] if a foreign key has the wrong
    /// shape for its relationship kind.
    pub fn from_record(model: &dyn ModelSchema, record: RecordHash) -> StashResult<Self> {
        let mut snapshot = Self::new(model.model_name());
        for (field, value) in record.into_map() {
            if field == "id" {
                snapshot.id = id_string(&value).filter(|id| !id.is_empty());
                continue;
            }
            let Some(rel) = model.relationship(&field) else {
                snapshot.attributes.insert(field, value);
                continue;
            };
            if rel.kind.is_single() {
                let id = match &value {
                    Value::Null => None,
                    other => Some(id_string(other).ok_or_else(|| {
                        StashError::InvalidRecord(format!("'{field}' must hold a single id"))
                    })?),
                };
                snapshot.belongs_to.insert(field, id);
            } else {
                let ids = match value {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items.iter().filter_map(id_string).collect(),
                    _ => {
                        return Err(StashError::InvalidRecord(format!(
                            "'{field}' must hold a list of ids"
                        )));
                    },
                };
                snapshot.has_many.insert(field, ids);
            }
        }
        Ok(snapshot)
    }
}

/// Type and id of a related resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// Model name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Record id.
    pub id: String,
}

/// Linkage of one relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    /// Single-valued.
    One(Option<ResourceIdentifier>),
    /// Multi-valued.
    Many(Vec<ResourceIdentifier>),
}

/// Relationship entry of a normalized resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Linkage.
    pub data: RelationshipData,
}

/// A record in the shape the host identity map consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Record id.
    pub id: String,
    /// Model name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Plain attributes.
    pub attributes: Map<String, Value>,
    /// Relationship linkage.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
}

impl Resource {
    /// Type and id of this resource.
    #[must_use]
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier {
            kind: self.kind.clone(),
            id: self.id.clone(),
        }
    }
}

/// Serialization contract of the host object layer.
pub trait HostSerializer: Send + Sync {
    /// Turn a snapshot into the record hash that will be stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot does not fit the model.
    fn serialize(
        &self,
        model: &dyn ModelSchema,
        snapshot: &Snapshot,
        include_id: bool,
    ) -> StashResult<RecordHash>;

    /// Turn a stored (or resolved) record hash into a host resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be represented.
    fn normalize(&self, model: &dyn ModelSchema, record: RecordHash) -> StashResult<Resource>;
}

/// Stock [`HostSerializer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    fn linkage(kind: RelationshipKind, related_type: &str, value: &Value) -> RelationshipData {
        let identifier = |v: &Value| {
            Some(v)
                .filter(|v| is_truthy(v))
                .and_then(id_string)
                .map(|id| ResourceIdentifier {
                    kind: related_type.to_owned(),
                    id,
                })
        };
        if kind.is_single() {
            RelationshipData::One(identifier(value))
        } else {
            let ids = match value {
                Value::Array(items) => items.iter().filter_map(identifier).collect(),
                _ => Vec::new(),
            };
            RelationshipData::Many(ids)
        }
    }
}

impl HostSerializer for JsonSerializer {
    fn serialize(
        &self,
        model: &dyn ModelSchema,
        snapshot: &Snapshot,
        include_id: bool,
    ) -> StashResult<RecordHash> {
        let mut record = RecordHash::new();
        if include_id && let Some(id) = &snapshot.id {
            record.insert("id", Value::String(id.clone()));
        }
        for (name, value) in &snapshot.attributes {
            record.insert(name.clone(), value.clone());
        }

        let unknown = |name: &str| StashError::UnknownRelationship {
            model: model.model_name().to_owned(),
            relationship: name.to_owned(),
        };
        for (name, id) in &snapshot.belongs_to {
            let rel = model.relationship(name).ok_or_else(|| unknown(name))?;
            if !rel.kind.is_single() {
                return Err(StashError::InvalidRecord(format!(
                    "'{name}' is a has-many relationship"
                )));
            }
            record.insert(name.clone(), id.clone().map_or(Value::Null, Value::String));
        }
        for (name, ids) in &snapshot.has_many {
            let rel = model.relationship(name).ok_or_else(|| unknown(name))?;
            if rel.kind.is_single() {
                return Err(StashError::InvalidRecord(format!(
                    "'{name}' is a single-valued relationship"
                )));
            }
            record.insert(
                name.clone(),
                Value::Array(ids.iter().cloned().map(Value::String).collect()),
            );
        }
        Ok(record)
    }

    fn normalize(&self, model: &dyn ModelSchema, record: RecordHash) -> StashResult<Resource> {
        let id = record.id().ok_or_else(|| {
            StashError::InvalidRecord(format!(
                "cannot normalize a '{}' record without an id",
                model.model_name()
            ))
        })?;

        let mut attributes = Map::new();
        let mut relationships = BTreeMap::new();
        for (field, value) in record.into_map() {
            if field == "id" {
                continue;
            }
            match model.relationship(&field) {
                Some(rel) => {
                    let data = Self::linkage(rel.kind, &rel.related_type, &value);
                    relationships.insert(field, Relationship { data });
                },
                None => {
                    attributes.insert(field, value);
                },
            }
        }

        Ok(Resource {
            id,
            kind: model.model_name().to_owned(),
            attributes,
            relationships,
        })
    }
}
