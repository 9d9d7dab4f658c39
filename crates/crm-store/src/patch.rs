//! Field-level patches
//!
//! Writes send only the top-level fields that changed between a before and an
//! after snapshot, so concurrent writers touching different fields do not
//! clobber each other.

use crate::document::{to_document, Document};
use crate::error::StoreError;
use serde::Serialize;
use serde_json::Value;

/// Top-level fields of `after` that differ from `before`.
///
/// Fields present only in `before` are patched to `null`. Fields named in
/// `exclude` are never part of the patch.
pub fn diff<T: Serialize>(before: &T, after: &T, exclude: &[&str]) -> Result<Document, StoreError> {
    let before = to_document(before)?;
    let after = to_document(after)?;

    let mut patch = Document::new();
    for (field, value) in &after {
        if exclude.contains(&field.as_str()) {
            continue;
        }
        if before.get(field) != Some(value) {
            patch.insert(field.clone(), value.clone());
        }
    }
    for field in before.keys() {
        if !after.contains_key(field) && !exclude.contains(&field.as_str()) {
            patch.insert(field.clone(), Value::Null);
        }
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Rec {
        a: u32,
        b: Option<String>,
        list: Vec<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        extra: Option<u32>,
    }

    #[test]
    fn only_changed_fields() {
        let before = Rec {
            a: 1,
            b: Some("x".into()),
            list: vec![1],
            extra: Some(3),
        };
        let after = Rec {
            a: 1,
            b: None,
            list: vec![1, 2],
            extra: None,
        };
        let patch = diff(&before, &after, &[]).unwrap();
        assert_eq!(patch.len(), 3);
        assert_eq!(patch["b"], Value::Null);
        assert_eq!(patch["list"], serde_json::json!([1, 2]));
        assert_eq!(patch["extra"], Value::Null);

        let patch = diff(&before, &after, &["list"]).unwrap();
        assert!(!patch.contains_key("list"));
        assert!(diff(&before, &before, &[]).unwrap().is_empty());
    }
}
