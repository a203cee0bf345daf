//! Relationship resolution.
//!
//! Resolution walks a model's relationships one at a time: every
//! single-valued relationship first, then every multi-valued one, each in
//! declaration order. Each step waits for the previous fetch to finish. Only
//! relationships whose related model is persisted by this same adapter are
//! followed, and related records are fetched flat, so embedding never goes
//! deeper than one hop.

use serde_json::Value;
use tracing::trace;

use crate::adapter::LocalAdapter;
use crate::error::{StashError, StashResult};
use crate::record::{EmbeddedRecords, Payload, RecordHash, id_string, is_truthy};
use crate::schema::{ModelSchema, RelationshipDescriptor};

impl LocalAdapter {
    /// Embed the same-adapter relationships of `record`.
    ///
    /// With `allow_recursive` unset the record is returned as a bare payload.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error. A dangling foreign key surfaces as
    /// [`StashError::NotFound`] or [`StashError::BatchNotFound`].
    pub async fn resolve(
        &self,
        model: &dyn ModelSchema,
        record: RecordHash,
        allow_recursive: bool,
    ) -> StashResult<Payload> {
        let mut payload = Payload::new(record);
        if !allow_recursive {
            return Ok(payload);
        }

        let names = model.relationship_names();
        for name in names.iter() {
            let Some(rel) = model.relationship(name) else {
                continue;
            };
            if self.schema().adapter_for(&rel.related_type) != *self.id() {
                trace!(
                    model = model.model_name(),
                    relationship = name,
                    related = %rel.related_type,
                    "relationship served by another adapter"
                );
                continue;
            }
            let Some(key) = payload.record.get(name).cloned() else {
                continue;
            };
            if !is_truthy(&key) {
                continue;
            }

            let embedded = self.load_relationship(model, &rel, &key).await?;
            trace!(
                model = model.model_name(),
                relationship = name,
                records = embedded.records().count(),
                "relationship loaded"
            );
            payload.add_embedded(name, embedded);
        }
        Ok(payload)
    }

    /// [`resolve`](Self::resolve) each record in turn.
    ///
    /// # Errors
    ///
    /// Returns the first error; records after it are not resolved.
    pub async fn resolve_many(
        &self,
        model: &dyn ModelSchema,
        records: Vec<RecordHash>,
        allow_recursive: bool,
    ) -> StashResult<Vec<Payload>> {
        let mut payloads = Vec::with_capacity(records.len());
        for record in records {
            payloads.push(self.resolve(model, record, allow_recursive).await?);
        }
        Ok(payloads)
    }

    async fn load_relationship(
        &self,
        model: &dyn ModelSchema,
        rel: &RelationshipDescriptor,
        key: &Value,
    ) -> StashResult<EmbeddedRecords> {
        let related = self.model(&rel.related_type)?;
        let malformed = || {
            StashError::InvalidRecord(format!(
                "'{}' of a '{}' record has a malformed foreign key: {key}",
                rel.name,
                model.model_name()
            ))
        };

        if rel.kind.is_single() {
            let id = id_string(key).ok_or_else(malformed)?;
            let record = self.fetch_record(related.as_ref(), &id).await?;
            return Ok(EmbeddedRecords::One(record));
        }

        let Value::Array(items) = key else {
            return Err(malformed());
        };
        let ids = items
            .iter()
            .filter(|v| is_truthy(v))
            .map(|v| id_string(v).ok_or_else(malformed))
            .collect::<StashResult<Vec<_>>>()?;
        let records = self.fetch_many(related.as_ref(), ids.as_slice()).await?;
        Ok(EmbeddedRecords::Many(records))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use keystash_events::EventBus;
    use keystash_storage::StorageHandle;
    use serde_json::json;

    use crate::adapter::{AdapterOptions, FindOptions};
    use crate::schema::{AdapterId, ModelDef, Schema};
    use crate::serializer::Snapshot;

    use super::*;

    fn schema() -> Schema {
        Schema::new()
            .with_model(
                ModelDef::new("post")
                    .belongs_to("author", "author")
                    .has_many("comments", "comment"),
            )
            .with_model(ModelDef::new("author").has_many("posts", "post"))
            .with_model(ModelDef::new("comment").belongs_to("post", "post"))
    }

    fn adapter_with(schema: Schema) -> LocalAdapter {
        LocalAdapter::new(
            Arc::new(StorageHandle::memory(EventBus::new())),
            Arc::new(schema),
            AdapterOptions::default(),
        )
    }

    async fn seed(adapter: &LocalAdapter) {
        let snapshots = [
            Snapshot::new("author")
                .with_id("a1")
                .attr("name", "Ann")
                .has_many("posts", ["p1"]),
            Snapshot::new("comment")
                .with_id("c1")
                .attr("body", "first")
                .belongs_to("post", Some("p1")),
            Snapshot::new("comment")
                .with_id("c2")
                .attr("body", "second")
                .belongs_to("post", Some("p1")),
            Snapshot::new("post")
                .with_id("p1")
                .attr("title", "Hello")
                .belongs_to("author", Some("a1"))
                .has_many("comments", ["c1", "c2"]),
        ];
        for snapshot in &snapshots {
            adapter.create_record(snapshot).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_embeds_same_adapter_relationships() {
        let adapter = adapter_with(schema());
        seed(&adapter).await;

        let payload = adapter
            .find_record("post", "p1", FindOptions::default())
            .await
            .unwrap();
        let relations: Vec<_> = payload.embedded_relations().map(|(n, _)| n).collect();
        assert_eq!(relations, vec!["author", "comments"]);

        match payload.embedded("comments") {
            Some(EmbeddedRecords::Many(records)) => {
                let ids: Vec<_> = records.iter().filter_map(RecordHash::id).collect();
                assert_eq!(ids, vec!["c1", "c2"]);
            },
            other => panic!("unexpected embedding {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_embedding_stops_after_one_hop() {
        let adapter = adapter_with(schema());
        seed(&adapter).await;

        let payload = adapter
            .find_record("author", "a1", FindOptions::default())
            .await
            .unwrap();
        let Some(EmbeddedRecords::Many(posts)) = payload.embedded("posts") else {
            panic!("posts not embedded");
        };
        assert_eq!(posts.len(), 1);
        assert!(posts[0].get("_embedded").is_none());
        assert_eq!(posts[0].get("author"), Some(&json!("a1")));
    }

    #[tokio::test]
    async fn test_flat_find_skips_resolution() {
        let adapter = adapter_with(schema());
        seed(&adapter).await;

        let payload = adapter
            .find_record("post", "p1", FindOptions::flat())
            .await
            .unwrap();
        assert!(!payload.has_embedded());
    }

    #[tokio::test]
    async fn test_other_adapter_relationship_is_not_embedded() {
        let adapter = adapter_with(schema().with_adapter("author", AdapterId::new("rest")));
        seed(&adapter).await;

        let payload = adapter
            .find_record("post", "p1", FindOptions::default())
            .await
            .unwrap();
        assert!(payload.embedded("author").is_none());
        assert!(payload.embedded("comments").is_some());
        assert_eq!(payload.record.get("author"), Some(&json!("a1")));
    }

    #[tokio::test]
    async fn test_absent_foreign_key_is_skipped() {
        let adapter = adapter_with(schema());
        adapter
            .create_record(&Snapshot::new("post").with_id("p2").belongs_to("author", None))
            .await
            .unwrap();

        let payload = adapter
            .find_record("post", "p2", FindOptions::default())
            .await
            .unwrap();
        assert!(!payload.has_embedded());
    }

    #[tokio::test]
    async fn test_dangling_single_key_fails() {
        let adapter = adapter_with(schema());
        adapter
            .create_record(
                &Snapshot::new("post")
                    .with_id("p2")
                    .belongs_to("author", Some("ghost")),
            )
            .await
            .unwrap();

        let err = adapter
            .find_record("post", "p2", FindOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StashError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_dangling_many_key_fails_batch() {
        let adapter = adapter_with(schema());
        seed(&adapter).await;
        adapter
            .create_record(
                &Snapshot::new("post")
                    .with_id("p2")
                    .has_many("comments", ["c1", "ghost"]),
            )
            .await
            .unwrap();

        let err = adapter
            .find_record("post", "p2", FindOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StashError::BatchNotFound { .. }));
    }

    #[tokio::test]
    async fn test_falsy_ids_are_dropped() {
        let adapter = adapter_with(schema());
        seed(&adapter).await;
        let raw = RecordHash::try_from(json!({
            "id": "p3",
            "comments": ["c1", null, ""]
        }))
        .unwrap();
        let model = adapter.model("post").unwrap();

        let payload = adapter.resolve(model.as_ref(), raw, true).await.unwrap();
        assert_eq!(payload.record.get("comments"), Some(&json!(["c1"])));
        assert!(payload.embedded("comments").is_some());
    }

    #[tokio::test]
    async fn test_empty_has_many_is_not_embedded() {
        let adapter = adapter_with(schema());
        let raw = RecordHash::try_from(json!({"id": "p3", "comments": []})).unwrap();
        let model = adapter.model("post").unwrap();

        let payload = adapter.resolve(model.as_ref(), raw, true).await.unwrap();
        assert!(!payload.has_embedded());
        assert_eq!(payload.record.get("comments"), Some(&json!([])));
    }

    #[tokio::test]
    async fn test_malformed_has_many_key() {
        let adapter = adapter_with(schema());
        let raw = RecordHash::try_from(json!({"id": "p3", "comments": "c1"})).unwrap();
        let model = adapter.model("post").unwrap();

        let err = adapter.resolve(model.as_ref(), raw, true).await.unwrap_err();
        assert!(matches!(err, StashError::InvalidRecord(_)));
    }
}
