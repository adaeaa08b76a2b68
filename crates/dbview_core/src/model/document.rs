//! Loosely-typed document representation.

use serde_json::{Map, Value};

/// Field carrying the opaque unique key of every stored document.
pub const DOCUMENT_ID_FIELD: &str = "_id";

/// A schemaless document: field name to JSON value.
///
/// Field presence is key presence; a field set to `null` exists.
pub type Document = Map<String, Value>;

/// Builds a document from a JSON value, rejecting non-objects.
pub fn document_from_value(value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
