//! Bridge from `keystash_config::StashConfig` to runtime types.
//!
//! The config crate knows nothing about the record store. This module turns
//! its sections into the schema registry, adapter options, storage handle,
//! and log config the binary runs with.

use std::sync::Arc;

use keystash_config::{BackendKind, StashConfig, StorageSection};
use keystash_core::{AdapterId, AdapterOptions, ModelDef, Schema};
use keystash_events::EventBus;
use keystash_storage::{
    FileBackend, MemoryBackend, NativeStorage, StorageBackend, StorageHandle, StorageResult,
    SurrealKvBackend,
};
use keystash_telemetry::{LogConfig, LogFormat};

/// Build the schema registry from the `[models.*]` tables.
///
/// Single-valued relationships are declared before multi-valued ones; within
/// each table they keep the order they were written in.
pub(crate) fn to_schema(cfg: &StashConfig) -> Schema {
    let mut schema = Schema::new();
    for (name, section) in &cfg.models {
        let mut def = ModelDef::new(name);
        if let Some(url) = &section.url {
            def = def.with_url(url);
        }
        for (rel, target) in &section.belongs_to {
            def = def.belongs_to(rel, target);
        }
        for (rel, target) in &section.has_one {
            def = def.has_one(rel, target);
        }
        for (rel, target) in &section.has_many {
            def = def.has_many(rel, target);
        }
        schema = schema.with_model(def);

        if let Some(adapter) = &section.adapter {
            schema = schema.with_adapter(name, AdapterId::new(adapter));
        }
    }
    schema
}

/// Convert config to [`AdapterOptions`].
pub(crate) fn to_adapter_options(cfg: &StashConfig) -> AdapterOptions {
    AdapterOptions::default().with_root_key(&cfg.storage.root_key)
}

/// Convert config to [`LogConfig`].
pub(crate) fn to_log_config(cfg: &StashConfig) -> LogConfig {
    let format = match cfg.logging.format.as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        "full" => LogFormat::Full,
        _ => LogFormat::Compact,
    };

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    log_config
}

/// Factory opening the configured storage medium.
///
/// A file or surrealkv backend without a path reports the medium as missing,
/// which makes the handle fall back to memory.
pub(crate) fn to_native_storage(storage: &StorageSection) -> NativeStorage {
    let backend = storage.backend;
    let path = storage.path.clone();
    Box::new(move || -> StorageResult<Option<Arc<dyn StorageBackend>>> {
        let opened: Arc<dyn StorageBackend> = match (backend, &path) {
            (BackendKind::Memory, _) => Arc::new(MemoryBackend::new()),
            (_, None) => return Ok(None),
            (BackendKind::File, Some(dir)) => Arc::new(FileBackend::open(dir)?),
            (BackendKind::SurrealKv, Some(dir)) => Arc::new(SurrealKvBackend::open(dir)?),
        };
        Ok(Some(opened))
    })
}

/// Build the storage handle for the configured medium.
pub(crate) fn to_storage_handle(storage: &StorageSection, events: EventBus) -> StorageHandle {
    StorageHandle::new(to_native_storage(storage), events)
}
