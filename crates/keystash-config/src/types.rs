//! Configuration types.
//!
//! These types have no dependency on other keystash crates. Conversion into
//! storage handles, log configs and schemas happens in the binary that loads
//! them. Every struct implements [`Default`] so that a bare `[section]`
//! header produces a working configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StashConfig {
    /// Where the root document lives.
    pub storage: StorageSection,
    /// Log output.
    pub logging: LoggingSection,
    /// Declared models, keyed by model name.
    pub models: BTreeMap<String, ModelSection>,
}

/// Storage medium selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One JSON file per key in `path`.
    #[default]
    File,
    /// Process-local memory; nothing survives exit.
    Memory,
    /// Embedded `SurrealKV` store in `path`.
    #[serde(rename = "surrealkv")]
    SurrealKv,
}

impl BackendKind {
    /// Whether the backend needs a `path`.
    #[must_use]
    pub fn needs_path(self) -> bool {
        !matches!(self, Self::Memory)
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            "surrealkv" => Ok(Self::SurrealKv),
            other => Err(format!(
                "unknown backend '{other}'; expected one of: file, memory, surrealkv"
            )),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Storage key holding the root document.
    pub root_key: String,
    /// Storage medium.
    pub backend: BackendKind,
    /// Directory for the file and surrealkv backends.
    pub path: Option<PathBuf>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            root_key: "DS.LSAdapter".to_owned(),
            backend: BackendKind::default(),
            path: None,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["keystash_core=trace"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

/// `[models.<name>]` section.
///
/// Relationship tables map a relationship name to the related model name and
/// keep the order they are written in:
///
/// ```toml
/// [models.post]
/// url = "posts"
/// belongs_to = { author = "author" }
/// has_many = { comments = "comment" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// Namespace override inside the root document.
    pub url: Option<String>,
    /// Adapter persisting this model when it is not the local store.
    pub adapter: Option<String>,
    /// Belongs-to relationships.
    pub belongs_to: IndexMap<String, String>,
    /// Has-one relationships.
    pub has_one: IndexMap<String, String>,
    /// Has-many relationships.
    pub has_many: IndexMap<String, String>,
}

impl ModelSection {
    /// Every declared relationship as `(name, related model)`.
    pub fn relationship_targets(&self) -> impl Iterator<Item = (&str, &str)> {
        self.belongs_to
            .iter()
            .chain(&self.has_one)
            .chain(&self.has_many)
            .map(|(name, target)| (name.as_str(), target.as_str()))
    }
}
