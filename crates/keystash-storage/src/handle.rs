//! Lazily-initialized storage handle with in-memory fallback.
//!
//! The handle is the explicit replacement for a process-wide storage
//! singleton: whoever builds an adapter builds a handle and passes it in.
//! The native medium is opened on first use and memoized for the life of
//! the handle. If opening fails, or the factory reports that no native
//! medium exists, the handle swaps in a [`MemoryBackend`] and publishes
//! [`StashEvent::PersistenceUnavailable`]. No operation fails because of
//! the fallback.

use std::sync::{Arc, OnceLock};

use keystash_events::{EventBus, EventMetadata, StashEvent};
use tracing::{debug, warn};

use crate::backend::{MemoryBackend, StorageBackend};
use crate::error::StorageResult;

/// Factory for the native storage medium.
///
/// `Ok(Some(_))` selects the returned backend. `Ok(None)` means the medium
/// does not exist in this environment and `Err(_)` means opening it failed;
/// both trigger the in-memory fallback.
pub type NativeStorage =
    Box<dyn Fn() -> StorageResult<Option<Arc<dyn StorageBackend>>> + Send + Sync>;

struct Initialized {
    backend: Arc<dyn StorageBackend>,
    fallback: bool,
}

/// Shared access to the storage medium of one adapter.
pub struct StorageHandle {
    native: NativeStorage,
    events: EventBus,
    state: OnceLock<Initialized>,
}

impl std::fmt::Debug for StorageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageHandle")
            .field("initialized", &self.is_initialized())
            .field("backend", &self.state.get().map(|s| s.backend.name()))
            .finish_non_exhaustive()
    }
}

impl StorageHandle {
    /// Create a handle that opens its medium through `native` on first use.
    #[must_use]
    pub fn new(native: NativeStorage, events: EventBus) -> Self {
        Self {
            native,
            events,
            state: OnceLock::new(),
        }
    }

    /// Create a handle around an already-open backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn StorageBackend>, events: EventBus) -> Self {
        Self::new(Box::new(move || Ok(Some(Arc::clone(&backend)))), events)
    }

    /// Create a handle backed by a fresh in-memory store.
    #[must_use]
    pub fn memory(events: EventBus) -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()), events)
    }

    /// The event bus fallback notifications are published on.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Whether the medium has been opened yet.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    /// Whether the handle is serving from the in-memory substitute.
    ///
    /// Forces initialization.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.initialized().fallback
    }

    /// The active backend, opening it on first call.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        Arc::clone(&self.initialized().backend)
    }

    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.backend().get_item(key).await
    }

    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        self.backend().set_item(key, value).await
    }

    /// Flush and release the medium if it was ever opened.
    ///
    /// # Errors
    ///
    /// Propagates backend errors from the flush.
    pub async fn close(&self) -> StorageResult<()> {
        match self.state.get() {
            Some(state) => state.backend.close().await,
            None => Ok(()),
        }
    }

    fn initialized(&self) -> &Initialized {
        self.state.get_or_init(|| match (self.native)() {
            Ok(Some(backend)) => {
                debug!(backend = backend.name(), "native storage available");
                self.events.publish(StashEvent::BackendReady {
                    metadata: EventMetadata::new("storage"),
                    backend: backend.name().to_owned(),
                });
                Initialized {
                    backend,
                    fallback: false,
                }
            },
            Ok(None) => self.enable_in_memory_storage(None),
            Err(e) => self.enable_in_memory_storage(Some(e.to_string())),
        })
    }

    fn enable_in_memory_storage(&self, reason: Option<String>) -> Initialized {
        warn!(
            reason = reason.as_deref().unwrap_or("native storage missing"),
            "persistence unavailable, falling back to in-memory storage"
        );
        self.events.publish(StashEvent::PersistenceUnavailable {
            metadata: EventMetadata::new("storage"),
            reason,
        });
        Initialized {
            backend: Arc::new(MemoryBackend::new()),
            fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_native_backend_is_used() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        let handle = StorageHandle::memory(bus);

        assert!(!handle.is_initialized());
        handle.set_item("k", "v".into()).await.unwrap();
        assert!(handle.is_initialized());
        assert!(!handle.is_fallback());

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.event_type(), "backend_ready");
    }

    #[tokio::test]
    async fn test_failing_native_falls_back_with_event() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe_type("persistence_unavailable");
        let handle = StorageHandle::new(
            Box::new(|| Err(StorageError::Connection("quota exceeded".into()))),
            bus,
        );

        handle.set_item("k", "v".into()).await.unwrap();
        assert_eq!(handle.get_item("k").await.unwrap().as_deref(), Some("v"));
        assert!(handle.is_fallback());

        let event = receiver.try_recv().unwrap();
        match &*event {
            StashEvent::PersistenceUnavailable { reason, .. } => {
                assert!(reason.as_deref().unwrap().contains("quota exceeded"));
            },
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_native_falls_back_without_reason() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        let handle = StorageHandle::new(Box::new(|| Ok(None)), bus);

        assert!(handle.get_item("k").await.unwrap().is_none());
        assert!(handle.is_fallback());
        match &*receiver.try_recv().unwrap() {
            StashEvent::PersistenceUnavailable { reason, .. } => assert!(reason.is_none()),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_initialization_is_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle = StorageHandle::new(
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some(Arc::new(MemoryBackend::new()) as Arc<dyn StorageBackend>))
            }),
            EventBus::new(),
        );

        handle.set_item("k", "v".into()).await.unwrap();
        handle.set_item("k", "w".into()).await.unwrap();
        assert_eq!(handle.get_item("k").await.unwrap().as_deref(), Some("w"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_before_init_is_noop() {
        let handle = StorageHandle::memory(EventBus::new());
        handle.close().await.unwrap();
        assert!(!handle.is_initialized());
    }
}
