//! Event types published on the [`EventBus`](crate::EventBus).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Component that emitted the event (e.g. `"storage"`, `"adapter"`).
    pub source: String,
}

impl EventMetadata {
    /// Create metadata for an event emitted by `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
        }
    }
}

/// Notifications emitted by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StashEvent {
    /// The native storage medium could not be used; an in-memory substitute
    /// is now serving every read and write.
    PersistenceUnavailable {
        /// Event metadata.
        metadata: EventMetadata,
        /// Why the native medium was rejected, if an error was reported.
        reason: Option<String>,
    },

    /// A storage backend finished initializing.
    BackendReady {
        /// Event metadata.
        metadata: EventMetadata,
        /// Backend name (`"memory"`, `"file"`, `"surrealkv"`).
        backend: String,
    },

    /// A model namespace was written back to storage.
    NamespacePersisted {
        /// Event metadata.
        metadata: EventMetadata,
        /// Storage namespace of the model.
        namespace: String,
        /// Number of records in the namespace after the write.
        records: usize,
    },
}

impl StashEvent {
    /// Stable snake-case name of the event variant.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PersistenceUnavailable { .. } => "persistence_unavailable",
            Self::BackendReady { .. } => "backend_ready",
            Self::NamespacePersisted { .. } => "namespace_persisted",
        }
    }

    /// Metadata of the event.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            Self::PersistenceUnavailable { metadata, .. }
            | Self::BackendReady { metadata, .. }
            | Self::NamespacePersisted { metadata, .. } => metadata,
        }
    }
}
