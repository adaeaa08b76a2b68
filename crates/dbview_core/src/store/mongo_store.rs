//! MongoDB-backed document store.
//!
//! Filters and group-counts run server-side: `AnyFieldMissing` becomes an
//! `$or` of `$exists: false` clauses and `count_by_field` an aggregation
//! pipeline of `$match`, `$group` and `$match` on the count.
//!
//! # Invariants
//! - Uses the blocking driver API; never call it on an async worker thread.
//! - `ObjectId` values surface as hex strings and BSON dates as RFC 3339
//!   strings, so documents decode the same way as SQLite-backed ones.

use crate::model::document::{Document, DOCUMENT_ID_FIELD};
use crate::store::document_store::{DocumentFilter, DocumentStore};
use crate::store::{StoreError, StoreResult};
use log::{debug, info};
use mongodb::bson::{doc, Bson, Document as BsonDocument};
use mongodb::sync::{Client, Database};
use serde_json::Value;

/// Document store over one MongoDB database.
pub struct MongoDocumentStore {
    database: Database,
}

impl MongoDocumentStore {
    /// Builds a client for `uri` and selects `database`.
    ///
    /// No round-trip happens here; call [`MongoDocumentStore::ping`] to
    /// verify the deployment answers.
    pub fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri)?;
        info!("event=mongo_client module=store status=ok database={database}");
        Ok(Self {
            database: client.database(database),
        })
    }

    /// Runs the `ping` command against the selected database.
    pub fn ping(&self) -> StoreResult<()> {
        self.database.run_command(doc! { "ping": 1 }).run()?;
        Ok(())
    }
}

impl DocumentStore for MongoDocumentStore {
    fn find(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Vec<Document>> {
        let query = match filter {
            DocumentFilter::All => BsonDocument::new(),
            DocumentFilter::AnyFieldMissing(fields) => match missing_fields_query(fields)? {
                Some(query) => query,
                None => return Ok(Vec::new()),
            },
        };
        debug!("event=docstore_find module=store backend=mongodb collection={collection} filter={filter:?}");

        self.database
            .collection::<BsonDocument>(collection)
            .find(query)
            .run()?
            .map(|item| item.map(document_from_bson).map_err(StoreError::from))
            .collect()
    }

    fn count_by_field(
        &self,
        collection: &str,
        field: &str,
        min_count: u64,
    ) -> StoreResult<Vec<(Value, u64)>> {
        let pipeline = group_pipeline(field, min_count)?;
        let cursor = self
            .database
            .collection::<BsonDocument>(collection)
            .aggregate(pipeline)
            .run()?;

        let mut groups = Vec::new();
        for item in cursor {
            let mut group = item?;
            let value = group.remove("_id").map_or(Value::Null, bson_to_json);
            groups.push((value, group_count(group.get("count"))?));
        }
        Ok(groups)
    }
}

/// Rejects names the aggregation language would read as operators.
fn check_field(field: &str) -> StoreResult<()> {
    if field.is_empty() || field.starts_with('$') {
        return Err(StoreError::QueryFailed(format!(
            "unsupported field name `{field}`"
        )));
    }
    Ok(())
}

/// `None` when nothing can be missing (empty list or only `_id`).
fn missing_fields_query(fields: &[String]) -> StoreResult<Option<BsonDocument>> {
    let mut clauses = Vec::new();
    for field in fields.iter().filter(|field| field.as_str() != DOCUMENT_ID_FIELD) {
        check_field(field)?;
        let mut clause = BsonDocument::new();
        clause.insert(field.as_str(), doc! { "$exists": false });
        clauses.push(clause);
    }
    if clauses.is_empty() {
        return Ok(None);
    }
    Ok(Some(doc! { "$or": clauses }))
}

fn group_pipeline(field: &str, min_count: u64) -> StoreResult<Vec<BsonDocument>> {
    check_field(field)?;
    let mut present = BsonDocument::new();
    present.insert(field, doc! { "$exists": true });
    let group_key = format!("${field}");
    let min_count = i64::try_from(min_count).unwrap_or(i64::MAX);

    Ok(vec![
        doc! { "$match": present },
        doc! { "$group": { "_id": group_key, "count": { "$sum": 1 } } },
        doc! { "$match": { "count": { "$gte": min_count } } },
    ])
}

fn group_count(value: Option<&Bson>) -> StoreResult<u64> {
    let count = match value {
        Some(Bson::Int32(count)) => u64::try_from(*count).ok(),
        Some(Bson::Int64(count)) => u64::try_from(*count).ok(),
        Some(Bson::Double(count)) if count.fract() == 0.0 && *count >= 0.0 => Some(*count as u64),
        _ => None,
    };
    count.ok_or_else(|| StoreError::DecodeFailed(format!("invalid group count {value:?}")))
}

fn document_from_bson(doc: BsonDocument) -> Document {
    doc.into_iter()
        .map(|(key, value)| (key, bson_to_json(value)))
        .collect()
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(at) => match at.try_to_rfc3339_string() {
            Ok(text) => Value::String(text),
            Err(_) => Bson::DateTime(at).into_relaxed_extjson(),
        },
        Bson::Document(doc) => Value::Object(document_from_bson(doc)),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}
