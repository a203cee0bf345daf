//! Write commands: put, delete.

use anyhow::Context;
use keystash_core::{FindOptions, LocalAdapter, RecordHash, Snapshot, StashError};
use serde_json::{Value, json};
use tracing::debug;

/// Create or update a record from its JSON form.
///
/// A record whose id is already stored is updated; anything else is
/// created, with a generated id when the JSON carries none.
pub(crate) async fn put(
    adapter: &LocalAdapter,
    model: &str,
    json: &str,
) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(json).context("record must be valid JSON")?;
    let record = RecordHash::try_from(value)?;
    let schema = adapter.model(model)?;
    let snapshot = Snapshot::from_record(schema.as_ref(), record)?;

    let existing = match snapshot.id.as_deref() {
        Some(id) => exists(adapter, model, id).await?,
        None => false,
    };
    debug!(model, id = ?snapshot.id, existing, "putting record");

    let stored = if existing {
        adapter.update_record(&snapshot).await?
    } else {
        adapter.create_record(&snapshot).await?
    };
    Ok(Value::Object(stored.into_map()))
}

/// Remove a record.
pub(crate) async fn delete(
    adapter: &LocalAdapter,
    model: &str,
    id: &str,
) -> anyhow::Result<Value> {
    let deleted = adapter.delete_record(model, id).await?;
    Ok(json!({ "id": id, "deleted": deleted }))
}

async fn exists(adapter: &LocalAdapter, model: &str, id: &str) -> anyhow::Result<bool> {
    match adapter.find_record(model, id, FindOptions::flat()).await {
        Ok(_) => Ok(true),
        Err(StashError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
