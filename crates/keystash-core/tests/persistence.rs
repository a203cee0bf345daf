//! Integration tests for the write path and the storage medium.

use std::sync::Arc;

use keystash_core::{AdapterOptions, FindOptions, LocalAdapter, Snapshot, StashError};
use keystash_events::{EventBus, StashEvent};
use keystash_storage::{FileBackend, StorageBackend, StorageHandle};
use keystash_test::{
    BrokenBackend, FailingNativeStorage, StorageCall, blog_adapter, blog_schema, drain_events,
    memory_handle, missing_native_storage, recording_handle, seed_blog, setup_test_logging,
    test_dir,
};
use serde_json::json;

fn file_adapter(dir: &std::path::Path) -> LocalAdapter {
    let backend = FileBackend::open(dir).unwrap();
    let storage = StorageHandle::with_backend(Arc::new(backend), EventBus::new());
    blog_adapter(Arc::new(storage))
}

#[tokio::test]
async fn test_record_survives_reopening_the_medium() {
    let dir = test_dir();
    {
        let adapter = file_adapter(dir.path());
        adapter
            .create_record(&Snapshot::new("author").with_id("a1").attr("name", "Ann"))
            .await
            .unwrap();
        adapter.store().storage().close().await.unwrap();
    }

    let adapter = file_adapter(dir.path());
    let payload = adapter
        .find_record("author", "a1", FindOptions::default())
        .await
        .unwrap();
    assert_eq!(payload.record.get("name"), Some(&json!("Ann")));
}

#[tokio::test]
async fn test_delete_then_find_is_not_found() {
    let adapter = blog_adapter(memory_handle());
    seed_blog(&adapter).await.unwrap();

    adapter.delete_record("comment", "c3").await.unwrap();

    let err = adapter
        .find_record("comment", "c3", FindOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Couldn't find record of type 'comment' for the id 'c3'."
    );
}

#[tokio::test]
async fn test_write_rewrites_whole_root_document() {
    let (storage, backend) = recording_handle();
    let adapter = blog_adapter(Arc::clone(&storage));
    seed_blog(&adapter).await.unwrap();
    backend.clear();

    adapter
        .update_record(&Snapshot::new("comment").with_id("c1").attr("body", "Edited"))
        .await
        .unwrap();

    let calls = backend.calls();
    assert_eq!(calls.last(), Some(&StorageCall::Set("DS.LSAdapter".into())));
    assert_eq!(calls.iter().filter(|c| matches!(c, StorageCall::Set(_))).count(), 1);

    let root = adapter.load_data().await.unwrap();
    assert!(root.contains_key("post"));
    assert!(root.contains_key("author"));
    assert_eq!(root["comment"]["records"]["c1"]["body"], "Edited");
    assert!(root["comment"]["records"]["c1"].get("post").is_none());
}

#[tokio::test]
async fn test_custom_root_key() {
    let storage = memory_handle();
    let adapter = LocalAdapter::new(
        Arc::clone(&storage),
        Arc::new(blog_schema()),
        AdapterOptions::default().with_root_key("blog"),
    );
    adapter
        .create_record(&Snapshot::new("post").with_id("p1"))
        .await
        .unwrap();

    assert!(storage.get_item("blog").await.unwrap().is_some());
    assert!(storage.get_item("DS.LSAdapter").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unavailable_medium_falls_back_to_memory() {
    let events = EventBus::new();
    let mut receiver = events.subscribe();
    let storage = Arc::new(FailingNativeStorage::new("quota exceeded").into_handle(events));
    let adapter = blog_adapter(Arc::clone(&storage));

    seed_blog(&adapter).await.unwrap();
    let payload = adapter
        .find_record("post", "p1", FindOptions::default())
        .await
        .unwrap();
    assert!(payload.embedded("author").is_some());
    assert!(storage.is_fallback());

    let unavailable: Vec<_> = drain_events(&mut receiver)
        .into_iter()
        .filter_map(|event| match event.as_ref() {
            StashEvent::PersistenceUnavailable { reason, .. } => Some(reason.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(unavailable.len(), 1);
    assert!(unavailable[0].as_deref().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn test_absent_medium_keeps_records_in_memory() {
    setup_test_logging("keystash_storage=debug,keystash_core=debug");

    let events = EventBus::new();
    let mut receiver = events.subscribe();
    let storage = Arc::new(StorageHandle::new(missing_native_storage(), events));
    let adapter = blog_adapter(Arc::clone(&storage));
    assert!(!storage.is_initialized());

    adapter
        .create_record(&Snapshot::new("author").with_id("a9").attr("name", "Dee"))
        .await
        .unwrap();
    let found = adapter
        .find_record("author", "a9", FindOptions::flat())
        .await
        .unwrap();
    assert_eq!(found.record.get("name"), Some(&json!("Dee")));
    assert!(storage.is_fallback());

    let reasons: Vec<_> = drain_events(&mut receiver)
        .into_iter()
        .filter_map(|event| match event.as_ref() {
            StashEvent::PersistenceUnavailable { reason, .. } => Some(reason.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(reasons, vec![None]);
}

#[tokio::test]
async fn test_storage_failure_surfaces_as_error() {
    let storage = StorageHandle::with_backend(Arc::new(BrokenBackend), EventBus::new());
    let adapter = blog_adapter(Arc::new(storage));

    let err = adapter
        .create_record(&Snapshot::new("post").with_id("p1"))
        .await
        .unwrap_err();
    assert!(matches!(err, StashError::Storage(_)));
    assert_eq!(BrokenBackend.name(), "broken");
}

#[tokio::test]
async fn test_create_without_id_assigns_one() {
    let adapter = blog_adapter(memory_handle());

    let stored = adapter
        .create_record(&Snapshot::new("author").attr("name", "Cy"))
        .await
        .unwrap();
    let id = stored.id().unwrap();

    let all = adapter.find_all("author").await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id(), Some(id));
}
