//! Record hashes and resolution payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StashError, StashResult};

/// Key of the transient envelope holding embedded related records.
pub const EMBEDDED_KEY: &str = "_embedded";

/// JavaScript-style truthiness of a JSON value.
///
/// `null`, `false`, `0`, and `""` are falsy; everything else, including empty
/// arrays and objects, is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render an id-like JSON value as an id string.
///
/// Strings are taken as-is and numbers are formatted; anything else is not an id.
#[must_use]
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Serialized attributes and foreign keys of one record.
///
/// Always a JSON object. The `id` field identifies the record within its
/// model's namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordHash(Map<String, Value>);

impl RecordHash {
    /// Empty record hash.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record hash with only an id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("id".to_owned(), Value::String(id.into()));
        Self(map)
    }

    /// The record id, if present and truthy.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.0
            .get("id")
            .filter(|v| is_truthy(v))
            .and_then(id_string)
    }

    /// Whether the record carries a usable id.
    #[must_use]
    pub fn has_id(&self) -> bool {
        self.id().is_some()
    }

    /// Field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Remove a field.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.0.insert(field.into(), value);
        self
    }

    /// Underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the JSON object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RecordHash {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for RecordHash {
    type Error = StashError;

    fn try_from(value: Value) -> StashResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StashError::InvalidRecord(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

impl From<RecordHash> for Value {
    fn from(record: RecordHash) -> Self {
        Value::Object(record.0)
    }
}

/// Related records fetched for one relationship.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddedRecords {
    /// A belongs-to or has-one target.
    One(RecordHash),
    /// Has-many targets in foreign-key order.
    Many(Vec<RecordHash>),
}

impl EmbeddedRecords {
    /// Whether the fetched records may be attached: a single record must have
    /// an id, a sequence must be non-empty with an id on every element.
    #[must_use]
    pub fn is_embeddable(&self) -> bool {
        match self {
            Self::One(record) => record.has_id(),
            Self::Many(records) => !records.is_empty() && records.iter().all(RecordHash::has_id),
        }
    }

    /// Foreign-key value pointing at these records.
    #[must_use]
    pub fn foreign_key(&self) -> Value {
        match self {
            Self::One(record) => record.id().map_or(Value::Null, Value::String),
            Self::Many(records) => Value::Array(
                records
                    .iter()
                    .filter_map(RecordHash::id)
                    .map(Value::String)
                    .collect(),
            ),
        }
    }

    /// Records as a slice-like iterator.
    pub fn records(&self) -> impl Iterator<Item = &RecordHash> {
        let (one, many) = match self {
            Self::One(record) => (Some(record), &[][..]),
            Self::Many(records) => (None, records.as_slice()),
        };
        one.into_iter().chain(many.iter())
    }

    fn to_value(&self) -> Value {
        match self {
            Self::One(record) => Value::Object(record.as_map().clone()),
            Self::Many(records) => Value::Array(
                records
                    .iter()
                    .map(|r| Value::Object(r.as_map().clone()))
                    .collect(),
            ),
        }
    }

    fn from_value(relation: &str, value: Value) -> StashResult<Option<Self>> {
        match value {
            Value::Object(map) => Ok(Some(Self::One(RecordHash(map)))),
            Value::Array(items) => items
                .into_iter()
                .map(RecordHash::try_from)
                .collect::<StashResult<Vec<_>>>()
                .map(|records| Some(Self::Many(records))),
            Value::Null => Ok(None),
            other => Err(StashError::InvalidRecord(format!(
                "embedded '{relation}' must be an object or array, got {other}"
            ))),
        }
    }
}

/// A record together with the related records embedded for it.
///
/// The envelope only exists between resolution and extraction and is never
/// written to storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    /// The primary record, with foreign keys rewritten to ids.
    pub record: RecordHash,
    embedded: Vec<(String, EmbeddedRecords)>,
}

impl Payload {
    /// Payload with no embedded records.
    #[must_use]
    pub fn new(record: RecordHash) -> Self {
        Self {
            record,
            embedded: Vec::new(),
        }
    }

    /// Attach fetched related records under `relation`.
    ///
    /// The records are embedded and the foreign key rewritten only when they
    /// are [embeddable](EmbeddedRecords::is_embeddable). A sequence-valued
    /// foreign key is always stripped of falsy entries.
    pub fn add_embedded(&mut self, relation: &str, records: EmbeddedRecords) {
        if records.is_embeddable() {
            self.record.insert(relation, records.foreign_key());
            if let Some(slot) = self.embedded.iter_mut().find(|(name, _)| name == relation) {
                slot.1 = records;
            } else {
                self.embedded.push((relation.to_owned(), records));
            }
        }

        let filtered = match self.record.get(relation) {
            Some(Value::Array(ids)) => Some(
                ids.iter()
                    .filter(|v| is_truthy(v))
                    .cloned()
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        };
        if let Some(ids) = filtered {
            self.record.insert(relation, Value::Array(ids));
        }
    }

    /// Whether anything is embedded.
    #[must_use]
    pub fn has_embedded(&self) -> bool {
        !self.embedded.is_empty()
    }

    /// Embedded records of one relation.
    #[must_use]
    pub fn embedded(&self, relation: &str) -> Option<&EmbeddedRecords> {
        self.embedded
            .iter()
            .find(|(name, _)| name == relation)
            .map(|(_, records)| records)
    }

    /// Embedded relations in attachment order.
    pub fn embedded_relations(&self) -> impl Iterator<Item = (&str, &EmbeddedRecords)> {
        self.embedded.iter().map(|(name, r)| (name.as_str(), r))
    }

    /// Split into the bare record and the removed envelope.
    #[must_use]
    pub fn into_parts(self) -> (RecordHash, Vec<(String, EmbeddedRecords)>) {
        (self.record, self.embedded)
    }

    /// JSON form: the record's fields plus an `_embedded` object when
    /// anything is embedded.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = self.record.as_map().clone();
        if self.has_embedded() {
            let envelope: Map<String, Value> = self
                .embedded
                .iter()
                .map(|(name, records)| (name.clone(), records.to_value()))
                .collect();
            map.insert(EMBEDDED_KEY.to_owned(), Value::Object(envelope));
        }
        Value::Object(map)
    }

    /// Parse the JSON form produced by [`to_json`](Self::to_json).
    ///
    /// # Errors
    ///
    /// Returns [`StashError::InvalidRecord`] if the value or its envelope has
    /// the wrong shape.
    pub fn from_json(value: Value) -> StashResult<Self> {
        let mut record = RecordHash::try_from(value)?;
        let mut payload = Self::new(RecordHash::new());
        match record.remove(EMBEDDED_KEY) {
            None | Some(Value::Null) => {},
            Some(Value::Object(envelope)) => {
                for (relation, value) in envelope {
                    if let Some(records) = EmbeddedRecords::from_value(&relation, value)? {
                        payload.embedded.push((relation, records));
                    }
                }
            },
            Some(other) => {
                return Err(StashError::InvalidRecord(format!(
                    "{EMBEDDED_KEY} must be an object, got {other}"
                )));
            },
        }
        payload.record = record;
        Ok(payload)
    }
}

impl From<RecordHash> for Payload {
    fn from(record: RecordHash) -> Self {
        Self::new(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> RecordHash {
        RecordHash::try_from(value).unwrap()
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!("a")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!(3)));
    }

    #[test]
    fn test_record_id_accepts_numbers() {
        assert_eq!(rec(json!({"id": 7})).id().as_deref(), Some("7"));
        assert_eq!(rec(json!({"id": "x"})).id().as_deref(), Some("x"));
        assert!(rec(json!({"id": ""})).id().is_none());
        assert!(rec(json!({"title": "t"})).id().is_none());
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(RecordHash::try_from(json!([1, 2])).is_err());
    }

    #[test]
    fn test_add_embedded_single() {
        let mut payload = Payload::new(rec(json!({"id": "p1", "author": "a1"})));
        payload.add_embedded(
            "author",
            EmbeddedRecords::One(rec(json!({"id": "a1", "name": "Ann"}))),
        );
        assert_eq!(payload.record.get("author"), Some(&json!("a1")));
        assert!(matches!(
            payload.embedded("author"),
            Some(EmbeddedRecords::One(_))
        ));
    }

    #[test]
    fn test_add_embedded_many_rewrites_ids() {
        let mut payload = Payload::new(rec(json!({"id": "p1", "comments": ["c1", "c2"]})));
        payload.add_embedded(
            "comments",
            EmbeddedRecords::Many(vec![rec(json!({"id": "c1"})), rec(json!({"id": "c2"}))]),
        );
        assert_eq!(payload.record.get("comments"), Some(&json!(["c1", "c2"])));
    }

    #[test]
    fn test_invalid_embedding_is_skipped_but_ids_filtered() {
        let mut payload = Payload::new(rec(json!({"id": "p1", "comments": ["c1", null, ""]})));
        payload.add_embedded("comments", EmbeddedRecords::Many(Vec::new()));
        assert!(!payload.has_embedded());
        assert_eq!(payload.record.get("comments"), Some(&json!(["c1"])));
    }

    #[test]
    fn test_json_envelope_round_trip() {
        let mut payload = Payload::new(rec(json!({"id": "p1", "author": "a1"})));
        payload.add_embedded("author", EmbeddedRecords::One(rec(json!({"id": "a1"}))));

        let value = payload.to_json();
        assert_eq!(value[EMBEDDED_KEY]["author"]["id"], "a1");

        let parsed = Payload::from_json(value).unwrap();
        assert_eq!(parsed, payload);
        assert!(parsed.record.get(EMBEDDED_KEY).is_none());
    }

    #[test]
    fn test_payload_without_envelope_serializes_flat() {
        let payload = Payload::new(rec(json!({"id": "p1"})));
        assert_eq!(payload.to_json(), json!({"id": "p1"}));
    }
}
