//! Conjunctive field matching over a namespace.

use regex::Regex;
use serde_json::Value;

use crate::namespace::Namespace;
use crate::record::RecordHash;

/// Condition on one field.
#[derive(Debug, Clone)]
pub enum Criterion {
    /// The field must equal this JSON value exactly.
    Equals(Value),
    /// The field's text must match this pattern.
    Matches(Regex),
}

impl Criterion {
    /// Whether `field` (absent when `None`) satisfies the criterion.
    #[must_use]
    pub fn test(&self, field: Option<&Value>) -> bool {
        match (self, field) {
            (Self::Equals(expected), Some(actual)) => actual == expected,
            (Self::Equals(_) | Self::Matches(_), None) => false,
            (Self::Matches(pattern), Some(Value::String(text))) => pattern.is_match(text),
            (Self::Matches(pattern), Some(other)) => pattern.is_match(&other.to_string()),
        }
    }
}

impl From<Value> for Criterion {
    fn from(value: Value) -> Self {
        Self::Equals(value)
    }
}

impl From<Regex> for Criterion {
    fn from(pattern: Regex) -> Self {
        Self::Matches(pattern)
    }
}

/// Field criteria, all of which must hold.
#[derive(Debug, Clone, Default)]
pub struct Query {
    terms: Vec<(String, Criterion)>,
}

impl Query {
    /// Query matching every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion on `field`.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, criterion: impl Into<Criterion>) -> Self {
        self.terms.push((field.into(), criterion.into()));
        self
    }

    /// Require `field` to equal `value`.
    #[must_use]
    pub fn equals(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Criterion::Equals(value.into()))
    }

    /// Require `field` to match `pattern`.
    #[must_use]
    pub fn matches(self, field: impl Into<String>, pattern: Regex) -> Self {
        self.with(field, Criterion::Matches(pattern))
    }

    /// Whether the query has no criteria.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The criteria in insertion order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.terms.iter().map(|(f, c)| (f.as_str(), c))
    }

    /// Whether `record` satisfies every criterion.
    #[must_use]
    pub fn matches_record(&self, record: &RecordHash) -> bool {
        self.terms
            .iter()
            .all(|(field, criterion)| criterion.test(record.get(field)))
    }

    /// Copies of every matching record, in namespace iteration order.
    #[must_use]
    pub fn filter(&self, namespace: &Namespace) -> Vec<RecordHash> {
        namespace
            .iter()
            .filter(|record| self.matches_record(record))
            .cloned()
            .collect()
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
    fn test_exact_match() {
        let record = rec(json!({"id": "1", "title": "Hello", "draft": false}));
        assert!(Query::new().equals("title", "Hello").matches_record(&record));
        assert!(Query::new().equals("draft", false).matches_record(&record));
        assert!(!Query::new().equals("title", "hello").matches_record(&record));
    }

    #[test]
    fn test_exact_match_is_type_strict() {
        let record = rec(json!({"id": "1", "views": 3}));
        assert!(Query::new().equals("views", 3).matches_record(&record));
        assert!(!Query::new().equals("views", "3").matches_record(&record));
    }

    #[test]
    fn test_pattern_match() {
        let record = rec(json!({"id": "1", "title": "Hello world"}));
        let query = Query::new().matches("title", Regex::new("^Hello").unwrap());
        assert!(query.matches_record(&record));

        let other = rec(json!({"id": "2", "title": "Goodbye"}));
        assert!(!query.matches_record(&other));
    }

    #[test]
    fn test_pattern_against_number() {
        let record = rec(json!({"id": "1", "views": 42}));
        let query = Query::new().matches("views", Regex::new("^4").unwrap());
        assert!(query.matches_record(&record));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let record = rec(json!({"id": "1"}));
        assert!(!Query::new().equals("title", json!(null)).matches_record(&record));
        assert!(
            !Query::new()
                .matches("title", Regex::new(".*").unwrap())
                .matches_record(&record)
        );
    }

    #[test]
    fn test_conjunction() {
        let record = rec(json!({"id": "1", "title": "Hello", "author": "a1"}));
        let both = Query::new().equals("title", "Hello").equals("author", "a1");
        let one_wrong = Query::new().equals("title", "Hello").equals("author", "a2");
        assert!(both.matches_record(&record));
        assert!(!one_wrong.matches_record(&record));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let record = rec(json!({"id": "1"}));
        assert!(Query::new().matches_record(&record));
    }

    #[test]
    fn test_filter_namespace() {
        let mut ns = Namespace::default();
        ns.insert("1", rec(json!({"id": "1", "title": "Hello a"})));
        ns.insert("2", rec(json!({"id": "2", "title": "Other"})));
        ns.insert("3", rec(json!({"id": "3", "title": "Hello b"})));

        let found = Query::new()
            .matches("title", Regex::new("^Hello").unwrap())
            .filter(&ns);
        let ids: Vec<_> = found.iter().filter_map(RecordHash::id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }
}
