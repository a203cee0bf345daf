//! `KEYSTASH_*` environment overrides.
//!
//! Environment variables are the last layer: a set variable replaces whatever
//! the files configured.

use std::collections::HashMap;

use tracing::debug;

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "KEYSTASH_ROOT_KEY",
        field_path: "storage.root_key",
    },
    EnvMapping {
        var_name: "KEYSTASH_BACKEND",
        field_path: "storage.backend",
    },
    EnvMapping {
        var_name: "KEYSTASH_PATH",
        field_path: "storage.path",
    },
    EnvMapping {
        var_name: "KEYSTASH_LOG",
        field_path: "logging.level",
    },
];

/// Collect the `KEYSTASH_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("KEYSTASH_"))
        .collect()
}

/// Apply every mapped variable present in `env_vars` to `merged`.
///
/// Returns the number of variables applied.
pub fn apply_env_overrides<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;
    for mapping in ENV_MAPPINGS {
        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var override"
            );
            set_field(merged, mapping.field_path, toml::Value::String(val.clone()));
            count = count.saturating_add(1);
        }
    }
    count
}

/// Set a dotted `path` in a TOML tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };
    let mut current = root;
    for segment in segments {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    if let toml::Value::Table(table) = current {
        table.insert(leaf.to_owned(), value);
    }
}
