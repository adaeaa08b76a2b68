//! Document store contract and SQLite-backed implementation.
//!
//! Documents are JSON objects grouped into named collections. The SQLite
//! implementation keeps one row per document and answers filters and
//! group-counts with SQLite JSON functions, so scans never load a whole
//! collection into memory just to count it.
//!
//! # Invariants
//! - `_id` is stored in its own column and re-attached on read.
//! - Field presence means the key exists; a `null` value is present.

use crate::config::DocumentStoreLocation;
use crate::db::{open_db, open_db_in_memory, open_existing_db};
use crate::model::document::{document_from_value, Document, DOCUMENT_ID_FIELD};
use crate::store::{StoreError, StoreResult};
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Which documents a `find` returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFilter {
    /// Every document in the collection.
    All,
    /// Documents lacking at least one of the listed fields.
    ///
    /// An empty list matches nothing.
    AnyFieldMissing(Vec<String>),
}

/// Read-only access to a collection of loosely-typed documents.
pub trait DocumentStore {
    /// Returns documents of `collection` matching `filter`, in insertion order.
    fn find(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Vec<Document>>;

    /// Groups documents of `collection` by the value of `field` and returns
    /// `(value, count)` pairs with `count >= min_count`.
    ///
    /// Documents without `field` are not grouped. Output order is unspecified.
    fn count_by_field(
        &self,
        collection: &str,
        field: &str,
        min_count: u64,
    ) -> StoreResult<Vec<(Value, u64)>>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn find(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Vec<Document>> {
        (**self).find(collection, filter)
    }

    fn count_by_field(
        &self,
        collection: &str,
        field: &str,
        min_count: u64,
    ) -> StoreResult<Vec<(Value, u64)>> {
        (**self).count_by_field(collection, field, min_count)
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn find(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Vec<Document>> {
        (**self).find(collection, filter)
    }

    fn count_by_field(
        &self,
        collection: &str,
        field: &str,
        min_count: u64,
    ) -> StoreResult<Vec<(Value, u64)>> {
        (**self).count_by_field(collection, field, min_count)
    }
}

/// SQLite-backed document store.
///
/// The connection sits behind a mutex so one handle can be shared across
/// request threads.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Opens the store at the configured location.
    ///
    /// A file location must already exist; a mistyped path fails with
    /// `StoreError::Unavailable` instead of yielding a new empty store.
    pub fn open(location: &DocumentStoreLocation) -> StoreResult<Self> {
        let conn = match location {
            DocumentStoreLocation::Memory => open_db_in_memory()?,
            DocumentStoreLocation::File(path) => open_existing_db(path)?,
            DocumentStoreLocation::Mongo(_) => {
                return Err(StoreError::Unavailable(
                    "a mongodb location cannot be opened as a SQLite store".to_string(),
                ))
            }
        };
        Ok(Self::from_connection(conn))
    }

    /// Creates (or opens) a store file for seeding and imports.
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open(&DocumentStoreLocation::Memory)
    }

    /// Wraps a connection that already has migrations applied.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Verifies the store answers queries.
    pub fn ping(&self) -> StoreResult<()> {
        self.lock()?
            .query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Stores `doc` in `collection` and returns its key.
    ///
    /// A string `_id` is kept; otherwise a new key is generated. An existing
    /// document with the same key is replaced. Used to seed fixtures and
    /// import dumps; the read path never calls it.
    pub fn insert_document(&self, collection: &str, mut doc: Document) -> StoreResult<String> {
        let doc_id = match doc.remove(DOCUMENT_ID_FIELD) {
            Some(Value::String(id)) => id,
            Some(other) => {
                return Err(StoreError::QueryFailed(format!(
                    "document key must be a string, got {other}"
                )))
            }
            None => Uuid::new_v4().simple().to_string(),
        };
        let body = serde_json::to_string(&doc)
            .map_err(|err| StoreError::QueryFailed(format!("document not serializable: {err}")))?;

        self.lock()?.execute(
            "INSERT INTO documents (collection, doc_id, body)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, doc_id) DO UPDATE SET body = excluded.body;",
            [collection, doc_id.as_str(), body.as_str()],
        )?;
        Ok(doc_id)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("document store lock poisoned".to_string()))
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn find(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Vec<Document>> {
        let mut sql = String::from("SELECT doc_id, body FROM documents WHERE collection = ?");
        let mut bind_values = vec![SqlValue::Text(collection.to_string())];

        if let DocumentFilter::AnyFieldMissing(fields) = filter {
            // `_id` always exists, so it can never be the missing field.
            let checked: Vec<&String> = fields
                .iter()
                .filter(|field| field.as_str() != DOCUMENT_ID_FIELD)
                .collect();
            if checked.is_empty() {
                return Ok(Vec::new());
            }
            let mut clauses = Vec::with_capacity(checked.len());
            for field in checked {
                clauses.push("json_type(body, ?) IS NULL");
                bind_values.push(SqlValue::Text(field_path(field)?));
            }
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }
        sql.push_str(" ORDER BY seq");
        debug!("event=docstore_find module=store collection={collection} filter={filter:?}");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }

    fn count_by_field(
        &self,
        collection: &str,
        field: &str,
        min_count: u64,
    ) -> StoreResult<Vec<(Value, u64)>> {
        if field == DOCUMENT_ID_FIELD {
            // Keys are unique per collection.
            return Ok(if min_count <= 1 {
                self.find(collection, &DocumentFilter::All)?
                    .into_iter()
                    .filter_map(|doc| doc.get(DOCUMENT_ID_FIELD).cloned())
                    .map(|id| (id, 1))
                    .collect()
            } else {
                Vec::new()
            });
        }

        let path = field_path(field)?;
        let min_count = i64::try_from(min_count).unwrap_or(i64::MAX);
        let conn = self.lock()?;
        // `->` yields the JSON text of the value, so `"1"` and `1` stay apart,
        // as do `1` and `1.0`.
        let mut stmt = conn.prepare(
            "SELECT body -> ?2 AS value_json, COUNT(*) AS occurrences
             FROM documents
             WHERE collection = ?1
               AND json_type(body, ?2) IS NOT NULL
             GROUP BY value_json
             HAVING COUNT(*) >= ?3;",
        )?;
        let mut rows = stmt.query(params![collection, path, min_count])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            let value_json: String = row.get("value_json")?;
            let value = serde_json::from_str(&value_json).map_err(|err| {
                StoreError::DecodeFailed(format!("invalid grouped value `{value_json}`: {err}"))
            })?;
            let occurrences: i64 = row.get("occurrences")?;
            groups.push((value, occurrences.max(0) as u64));
        }
        Ok(groups)
    }
}

/// Builds a JSON path addressing one top-level key.
fn field_path(field: &str) -> StoreResult<String> {
    if field.is_empty() || field.contains('"') {
        return Err(StoreError::QueryFailed(format!(
            "unsupported field name `{field}`"
        )));
    }
    Ok(format!("$.\"{field}\""))
}

fn parse_document_row(row: &Row<'_>) -> StoreResult<Document> {
    let doc_id: String = row.get("doc_id")?;
    let body: String = row.get("body")?;
    let value: Value = serde_json::from_str(&body).map_err(|err| {
        StoreError::DecodeFailed(format!("document `{doc_id}` is not valid JSON: {err}"))
    })?;
    let mut doc = document_from_value(value).ok_or_else(|| {
        StoreError::DecodeFailed(format!("document `{doc_id}` is not a JSON object"))
    })?;
    doc.insert(DOCUMENT_ID_FIELD.to_string(), Value::String(doc_id));
    Ok(doc)
}
