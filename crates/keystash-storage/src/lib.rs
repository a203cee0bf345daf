//! Keystash Storage - the string key-value surface under the record store.
//!
//! Every keystash adapter keeps all of its data in a single JSON document
//! stored under one key. This crate supplies the medium that document lives
//! in:
//!
//! - [`StorageBackend`]: `get_item` / `set_item` over string keys and values
//! - [`MemoryBackend`]: in-memory map, always available
//! - [`FileBackend`]: one file per key inside a directory (the native medium)
//! - `SurrealKvBackend`: embedded LSM-tree store (behind the **`kv`** feature)
//! - [`StorageHandle`]: lazily opens the native medium once, falling back to
//!   [`MemoryBackend`] and publishing
//!   [`StashEvent::PersistenceUnavailable`](keystash_events::StashEvent) when
//!   the medium is unusable
//!
//! # Feature Flags
//!
//! - **`kv`**: `SurrealKV` persistent backend

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod backend;
pub mod error;
pub mod file;
pub mod handle;

#[cfg(feature = "kv")]
pub mod surreal;

pub use backend::{MemoryBackend, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use handle::{NativeStorage, StorageHandle};

#[cfg(feature = "kv")]
pub use surreal::SurrealKvBackend;
