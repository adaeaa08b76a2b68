//! Core of the dbview data-access and backup service.
//!
//! Store clients, the validation scanner, the snapshot writer and the
//! fetch service live here; the HTTP server and the check CLI are thin
//! layers over this crate.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod scan;
pub mod service;
pub mod snapshot;
pub mod store;

pub use config::{
    load_dotenv, load_dotenv_from, AppConfig, ConfigError, DocumentStoreLocation, DotenvStatus,
    RelationalSettings,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{Document, DOCUMENT_ID_FIELD};
pub use model::entity::{Account, Event, Message, RelationalBundle, Room, User};
pub use scan::validation::{
    find_duplicates, find_missing_fields, run_consistency_check, CheckError, CheckPlan,
    ConsistencyReport, DuplicateGroup,
};
pub use service::fetch_service::{EntityType, FetchError, FetchResult, FetchService};
pub use snapshot::{snapshot_file_name, write_snapshot, write_snapshot_on, SnapshotError};
pub use store::backend::DocumentBackend;
pub use store::document_store::{DocumentFilter, DocumentStore, SqliteDocumentStore};
pub use store::mongo_store::MongoDocumentStore;
pub use store::relational_store::{PgRelationalStore, RelationalStore};
pub use store::{StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
