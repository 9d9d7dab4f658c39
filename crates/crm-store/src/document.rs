//! Schemaless documents, collections and equality queries

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored record: top-level field name to JSON value
pub type Document = Map<String, Value>;

/// Top-level collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Leads,
    Enquiries,
    Tasks,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Leads, Collection::Enquiries, Collection::Tasks];

    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Leads => "leads",
            Collection::Enquiries => "enquiries",
            Collection::Tasks => "tasks",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conjunction of top-level equality filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<(String, Value)>,
}

impl Query {
    /// Match every document
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Add `field == value`
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| doc.get(field) == Some(value))
    }

    pub fn filters(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.filters.iter().map(|(f, v)| (f.as_str(), v))
    }
}

/// Serialize a record into a document
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {other}"
        ))),
    }
}

/// Deserialize a document into a record
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Ordering key that sorts sequential IDs numerically (`task2` < `task10`)
#[must_use]
pub fn id_order(id: &str) -> (usize, &str) {
    (id.len(), id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_matches_all_filters() {
        let doc = json!({"enquiryId": "enq001", "status": "open"});
        let Value::Object(doc) = doc else { unreachable!() };

        assert!(Query::all().matches(&doc));
        assert!(Query::all().eq("enquiryId", "enq001").matches(&doc));
        assert!(!Query::all()
            .eq("enquiryId", "enq001")
            .eq("status", "complete")
            .matches(&doc));
        assert!(!Query::all().eq("missing", "x").matches(&doc));
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(matches!(
            to_document(&5),
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn ids_order_numerically() {
        let mut ids = vec!["task10", "task2", "task1"];
        ids.sort_by_key(|id| id_order(id));
        assert_eq!(ids, vec!["task1", "task2", "task10"]);
    }
}
