//! Record store error types.

use keystash_storage::StorageError;

/// Errors surfaced by adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum StashError {
    /// A single-record fetch named an id that is not in the namespace.
    #[error("Couldn't find record of type '{model}' for the id '{id}'.")]
    NotFound {
        /// Model name.
        model: String,
        /// Missing id.
        id: String,
    },

    /// A multi-id fetch named at least one missing id; nothing is returned.
    #[error("Couldn't find record of type '{model}' for the id '{id}' (batch aborted).")]
    BatchNotFound {
        /// Model name.
        model: String,
        /// First missing id.
        id: String,
    },

    /// A filtered query matched no records.
    #[error("no '{model}' records matched the query")]
    NoMatch {
        /// Model name.
        model: String,
    },

    /// The schema does not declare the model.
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    /// The model does not declare the relationship.
    #[error("model '{model}' has no relationship '{relationship}'")]
    UnknownRelationship {
        /// Model name.
        model: String,
        /// Relationship name.
        relationship: String,
    },

    /// A record or payload does not have the expected shape.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The root document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The storage medium failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<serde_json::Error> for StashError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for adapter operations.
pub type StashResult<T> = Result<T, StashError>;
