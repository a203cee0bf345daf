//! Keystash Core - a relationship-resolving record store over one JSON blob.
//!
//! All records of every model live in a single JSON document kept under one
//! storage key, partitioned into per-model namespaces. On top of that
//! document the crate provides:
//!
//! - [`LocalAdapter`]: find, query, create, update and delete verbs
//! - [`Query`]: conjunctive exact-value and pattern matching over a namespace
//! - Relationship resolution ([`LocalAdapter::resolve`]): embeds related
//!   records of the same adapter under `_embedded`, one hop deep, fetched
//!   strictly in declaration order
//! - [`EmbeddingSerializer`]: flattens resolved payloads into
//!   `{ data, included }` documents
//!
//! The host object layer is reached through [`SchemaRegistry`],
//! [`ModelSchema`] and [`HostSerializer`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use keystash_core::{AdapterOptions, FindOptions, LocalAdapter, ModelDef, Schema, Snapshot};
//! use keystash_events::EventBus;
//! use keystash_storage::StorageHandle;
//!
//! # async fn example() -> keystash_core::StashResult<()> {
//! let schema = Schema::new()
//!     .with_model(ModelDef::new("post").belongs_to("author", "author"))
//!     .with_model(ModelDef::new("author"));
//! let adapter = LocalAdapter::new(
//!     Arc::new(StorageHandle::memory(EventBus::new())),
//!     Arc::new(schema),
//!     AdapterOptions::default(),
//! );
//!
//! adapter
//!     .create_record(&Snapshot::new("author").with_id("a1").attr("name", "Ann"))
//!     .await?;
//! adapter
//!     .create_record(&Snapshot::new("post").with_id("p1").belongs_to("author", Some("a1")))
//!     .await?;
//!
//! let payload = adapter.find_record("post", "p1", FindOptions::default()).await?;
//! assert!(payload.embedded("author").is_some());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapter;
pub mod embedding;
pub mod error;
pub mod ids;
mod loader;
pub mod namespace;
pub mod query;
pub mod record;
pub mod schema;
pub mod serializer;

pub use adapter::{AdapterOptions, DEFAULT_ROOT_KEY, FindOptions, LocalAdapter};
pub use embedding::{CollectionDocument, Document, EmbeddingSerializer};
pub use error::{StashError, StashResult};
pub use ids::generate_id;
pub use namespace::{Namespace, NamespaceStore};
pub use query::{Criterion, Query};
pub use record::{EMBEDDED_KEY, EmbeddedRecords, Payload, RecordHash};
pub use schema::{
    AdapterId, ModelDef, ModelSchema, RelationshipDescriptor, RelationshipKind,
    RelationshipNames, Schema, SchemaRegistry,
};
pub use serializer::{
    HostSerializer, JsonSerializer, Relationship, RelationshipData, Resource,
    ResourceIdentifier, Snapshot,
};
