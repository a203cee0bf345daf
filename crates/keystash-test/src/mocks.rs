//! Storage doubles.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keystash_events::{EventBus, EventReceiver, StashEvent};
use keystash_storage::{
    MemoryBackend, NativeStorage, StorageBackend, StorageError, StorageHandle, StorageResult,
};

/// Native storage factory that always fails to open.
///
/// A handle built from it serves every call from the in-memory substitute.
#[derive(Debug, Clone)]
pub struct FailingNativeStorage {
    reason: String,
}

impl FailingNativeStorage {
    /// Factory failing with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Boxed factory for [`StorageHandle::new`].
    #[must_use]
    pub fn into_factory(self) -> NativeStorage {
        Box::new(move || Err(StorageError::Connection(self.reason.clone())))
    }

    /// Storage handle over this factory.
    #[must_use]
    pub fn into_handle(self, events: EventBus) -> StorageHandle {
        StorageHandle::new(self.into_factory(), events)
    }
}

impl Default for FailingNativeStorage {
    fn default() -> Self {
        Self::new("storage medium is unavailable")
    }
}

/// Native storage factory reporting that no medium exists at all.
#[must_use]
pub fn missing_native_storage() -> NativeStorage {
    Box::new(|| Ok(None))
}

/// One call observed by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    /// `get_item(key)`.
    Get(String),
    /// `set_item(key, _)`.
    Set(String),
}

/// In-memory backend that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    inner: MemoryBackend,
    calls: Mutex<Vec<StorageCall>>,
}

impl RecordingBackend {
    /// Create an empty recording backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Forget the recorded calls.
    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record(&self, call: StorageCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl StorageBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.record(StorageCall::Get(key.to_owned()));
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        self.record(StorageCall::Set(key.to_owned()));
        self.inner.set_item(key, value).await
    }
}

/// Backend whose every operation fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokenBackend;

#[async_trait]
impl StorageBackend for BrokenBackend {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn get_item(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Internal("read refused".into()))
    }

    async fn set_item(&self, _key: &str, _value: String) -> StorageResult<()> {
        Err(StorageError::Internal("write refused".into()))
    }
}

/// Storage handle over a fresh [`RecordingBackend`], returning both.
#[must_use]
pub fn recording_handle() -> (Arc<StorageHandle>, Arc<RecordingBackend>) {
    let backend = Arc::new(RecordingBackend::new());
    let handle = StorageHandle::with_backend(
        Arc::clone(&backend) as Arc<dyn StorageBackend>,
        EventBus::new(),
    );
    (Arc::new(handle), backend)
}

/// Drain every event already queued on `receiver`.
pub fn drain_events(receiver: &mut EventReceiver) -> Vec<Arc<StashEvent>> {
    std::iter::from_fn(|| receiver.try_recv()).collect()
}
