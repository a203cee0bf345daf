//! Integration tests for resolving then extracting documents.

use std::sync::Arc;

use keystash_core::{
    EmbeddingSerializer, FindOptions, Query, RelationshipData, ResourceIdentifier,
};
use keystash_test::{blog_schema, seeded_adapter};
use regex::Regex;
use serde_json::json;

fn identifiers(resources: &[keystash_core::Resource]) -> Vec<(String, String)> {
    resources
        .iter()
        .map(|r| (r.kind.clone(), r.id.clone()))
        .collect()
}

#[tokio::test]
async fn test_embedding_round_trip() {
    let adapter = seeded_adapter().await;
    let serializer = EmbeddingSerializer::new(Arc::new(blog_schema()));

    let payload = adapter
        .find_record("comment", "c1", FindOptions::default())
        .await
        .unwrap();
    let doc = serializer.extract("comment", payload).unwrap();

    assert_eq!(doc.data.kind, "comment");
    assert_eq!(
        doc.data.relationships["post"].data,
        RelationshipData::One(Some(ResourceIdentifier {
            kind: "post".into(),
            id: "p1".into(),
        }))
    );
    assert_eq!(
        identifiers(&doc.included),
        vec![("post".to_string(), "p1".to_string())]
    );
    assert_eq!(doc.included[0].attributes["title"], "Hello world");
}

#[tokio::test]
async fn test_extracted_document_serializes_as_json_api() {
    let adapter = seeded_adapter().await;
    let serializer = EmbeddingSerializer::new(Arc::new(blog_schema()));

    let payload = adapter
        .find_record("post", "p3", FindOptions::default())
        .await
        .unwrap();
    let doc = serializer.extract("post", payload).unwrap();

    let value = serde_json::to_value(&doc).unwrap();
    assert_eq!(value["data"]["type"], "post");
    assert_eq!(
        value["data"]["relationships"]["author"]["data"],
        json!({"type": "author", "id": "a2"})
    );
    assert_eq!(value["included"][0]["type"], "author");
    assert_eq!(value["included"][0]["attributes"]["name"], "Bob");
}

#[tokio::test]
async fn test_cross_adapter_linkage_survives_extraction() {
    let adapter = seeded_adapter().await;
    let serializer = EmbeddingSerializer::new(Arc::new(blog_schema()));

    let payload = adapter
        .find_record("post", "p1", FindOptions::default())
        .await
        .unwrap();
    let doc = serializer.extract("post", payload).unwrap();

    match &doc.data.relationships["tags"].data {
        RelationshipData::Many(tags) => {
            assert_eq!(tags, &vec![ResourceIdentifier {
                kind: "tag".into(),
                id: "t1".into(),
            }]);
        },
        other => panic!("unexpected linkage {other:?}"),
    }
    assert!(doc.included.iter().all(|r| r.kind != "tag"));
}

#[tokio::test]
async fn test_extract_many_includes_shared_author_once() {
    let adapter = seeded_adapter().await;
    let serializer = EmbeddingSerializer::new(Arc::new(blog_schema()));

    let payloads = adapter
        .query(
            "post",
            &Query::new().matches("title", Regex::new("^Hello").unwrap()),
        )
        .await
        .unwrap();
    let doc = serializer.extract_many("post", payloads).unwrap();

    assert_eq!(
        identifiers(&doc.data),
        vec![
            ("post".to_string(), "p1".to_string()),
            ("post".to_string(), "p2".to_string()),
        ]
    );
    let included = identifiers(&doc.included);
    assert_eq!(
        included
            .iter()
            .filter(|(kind, id)| kind == "author" && id == "a1")
            .count(),
        1
    );
    assert_eq!(included.len(), 4);
}
