//! Extraction of resolved payloads into primary data plus side-loaded
//! related resources.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{StashError, StashResult};
use crate::record::{EmbeddedRecords, Payload};
use crate::schema::SchemaRegistry;
use crate::serializer::{HostSerializer, JsonSerializer, Resource, ResourceIdentifier};

/// One primary resource with the related resources embedded beside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Primary resource.
    pub data: Resource,
    /// Related resources in embedding order.
    #[serde(default)]
    pub included: Vec<Resource>,
}

/// Several primary resources with their related resources, each included
/// once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionDocument {
    /// Primary resources in payload order.
    pub data: Vec<Resource>,
    /// Related resources, deduplicated by type and id.
    #[serde(default)]
    pub included: Vec<Resource>,
}

/// Turns payloads carrying an embedded envelope into documents the host
/// identity map can load.
pub struct EmbeddingSerializer {
    schema: Arc<dyn SchemaRegistry>,
    host: Arc<dyn HostSerializer>,
}

impl std::fmt::Debug for EmbeddingSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingSerializer").finish_non_exhaustive()
    }
}

impl EmbeddingSerializer {
    /// Serializer normalizing through the stock [`JsonSerializer`].
    #[must_use]
    pub fn new(schema: Arc<dyn SchemaRegistry>) -> Self {
        Self::with_host(schema, Arc::new(JsonSerializer))
    }

    /// Serializer normalizing through `host`.
    #[must_use]
    pub fn with_host(schema: Arc<dyn SchemaRegistry>, host: Arc<dyn HostSerializer>) -> Self {
        Self { schema, host }
    }

    /// Extract one payload.
    ///
    /// The primary record is normalized without its envelope. Every embedded
    /// record is normalized as its relationship's related type and appended
    /// to `included`.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::UnknownModel`] or
    /// [`StashError::UnknownRelationship`] when the envelope does not fit the
    /// schema, or any error the host serializer raises.
    pub fn extract(&self, model_name: &str, payload: Payload) -> StashResult<Document> {
        let mut included = Vec::new();
        let data = self.extract_into(model_name, payload, &mut included)?;
        Ok(Document { data, included })
    }

    /// Extract several payloads. A related resource reached from more than
    /// one payload is included once.
    ///
    /// # Errors
    ///
    /// Same as [`extract`](Self::extract).
    pub fn extract_many(
        &self,
        model_name: &str,
        payloads: Vec<Payload>,
    ) -> StashResult<CollectionDocument> {
        let mut data = Vec::with_capacity(payloads.len());
        let mut included = Vec::new();
        for payload in payloads {
            data.push(self.extract_into(model_name, payload, &mut included)?);
        }

        let before = included.len();
        let mut seen: HashSet<ResourceIdentifier> = HashSet::new();
        included.retain(|resource| seen.insert(resource.identifier()));
        debug!(
            model = model_name,
            primary = data.len(),
            included = included.len(),
            duplicates = before.saturating_sub(included.len()),
            "payloads extracted"
        );
        Ok(CollectionDocument { data, included })
    }

    /// [`extract`](Self::extract) a payload given in its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::InvalidRecord`] if the value is not a payload,
    /// or any error of [`extract`](Self::extract).
    pub fn extract_json(&self, model_name: &str, value: Value) -> StashResult<Document> {
        self.extract(model_name, Payload::from_json(value)?)
    }

    fn extract_into(
        &self,
        model_name: &str,
        payload: Payload,
        included: &mut Vec<Resource>,
    ) -> StashResult<Resource> {
        let model = self
            .schema
            .model(model_name)
            .ok_or_else(|| StashError::UnknownModel(model_name.to_owned()))?;
        let (record, embedded) = payload.into_parts();

        for (relation, records) in embedded {
            let rel = model
                .relationship(&relation)
                .ok_or_else(|| StashError::UnknownRelationship {
                    model: model_name.to_owned(),
                    relationship: relation.clone(),
                })?;
            let related = self
                .schema
                .model(&rel.related_type)
                .ok_or_else(|| StashError::UnknownModel(rel.related_type.clone()))?;

            let records = match records {
                EmbeddedRecords::One(record) => vec![record],
                EmbeddedRecords::Many(records) => records,
            };
            for record in records {
                included.push(self.host.normalize(related.as_ref(), record)?);
            }
        }

        self.host.normalize(model.as_ref(), record)
    }
}
