//! Document store selected by the configured location.

use crate::config::DocumentStoreLocation;
use crate::model::document::Document;
use crate::store::document_store::{DocumentFilter, DocumentStore, SqliteDocumentStore};
use crate::store::mongo_store::MongoDocumentStore;
use crate::store::StoreResult;
use serde_json::Value;

/// The document store a binary runs against.
pub enum DocumentBackend {
    Sqlite(SqliteDocumentStore),
    Mongo(MongoDocumentStore),
}

impl DocumentBackend {
    /// Opens the backend named by `location`.
    ///
    /// `database` selects the MongoDB database and is ignored for SQLite.
    /// Blocking; MongoDB calls must not run on an async worker thread.
    pub fn open(location: &DocumentStoreLocation, database: &str) -> StoreResult<Self> {
        match location {
            DocumentStoreLocation::Mongo(uri) => {
                MongoDocumentStore::connect(uri, database).map(Self::Mongo)
            }
            sqlite => SqliteDocumentStore::open(sqlite).map(Self::Sqlite),
        }
    }

    pub fn ping(&self) -> StoreResult<()> {
        match self {
            Self::Sqlite(store) => store.ping(),
            Self::Mongo(store) => store.ping(),
        }
    }

    /// Backend name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Mongo(_) => "mongodb",
        }
    }
}

impl DocumentStore for DocumentBackend {
    fn find(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Vec<Document>> {
        match self {
            Self::Sqlite(store) => store.find(collection, filter),
            Self::Mongo(store) => store.find(collection, filter),
        }
    }

    fn count_by_field(
        &self,
        collection: &str,
        field: &str,
        min_count: u64,
    ) -> StoreResult<Vec<(Value, u64)>> {
        match self {
            Self::Sqlite(store) => store.count_by_field(collection, field, min_count),
            Self::Mongo(store) => store.count_by_field(collection, field, min_count),
        }
    }
}
