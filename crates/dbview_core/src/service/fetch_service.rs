//! Fetch-and-snapshot use cases behind the `/view/*` endpoints.
//!
//! # Responsibility
//! - Read every record of one entity type from its store.
//! - Write a dated snapshot of what was read, best-effort.
//!
//! # Invariants
//! - A snapshot failure is logged and never changes the fetch outcome.
//! - Document decode failures fail the whole fetch; relational row decode
//!   failures drop the row inside the store.
//! - A failing relational sub-query aborts the bundle; nothing partial is
//!   returned.

use crate::model::entity::{Account, Event, RelationalBundle};
use crate::snapshot::write_snapshot;
use crate::store::document_store::{DocumentFilter, DocumentStore};
use crate::store::relational_store::RelationalStore;
use crate::store::StoreError;
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;

pub const EVENTS_COLLECTION: &str = "events";
pub const ACCOUNTS_COLLECTION: &str = "accounts";

/// Entity types served by the fetch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Events,
    Accounts,
    RelationalBundle,
}

impl EntityType {
    /// Prefix of the entity's snapshot files.
    pub fn snapshot_prefix(self) -> &'static str {
        match self {
            Self::Events => "Events_Backup",
            Self::Accounts => "Accounts_Backup",
            Self::RelationalBundle => "PostgreSQL_Backup",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Accounts => "accounts",
            Self::RelationalBundle => "postgres_data",
        }
    }
}

/// Fetch failure for one entity type.
///
/// `target` names the collection or table whose query failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub entity: EntityType,
    pub target: &'static str,
    pub source: StoreError,
}

pub type FetchResult<T> = Result<T, FetchError>;

impl FetchError {
    fn new(entity: EntityType, target: &'static str, source: StoreError) -> Self {
        Self {
            entity,
            target,
            source,
        }
    }

    /// Response text safe to hand to HTTP clients.
    pub fn public_message(&self) -> String {
        match self.source {
            StoreError::DecodeFailed(_) => format!("Failed to decode {}", self.target),
            _ => format!("Failed to fetch {}", self.target),
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fetching {} failed on {}: {}",
            self.entity.as_str(),
            self.target,
            self.source
        )
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Fetch-and-snapshot orchestration over injected store handles.
pub struct FetchService<D, R> {
    documents: D,
    relational: R,
    snapshot_dir: PathBuf,
}

impl<D, R> FetchService<D, R>
where
    D: DocumentStore,
    R: RelationalStore,
{
    pub fn new(documents: D, relational: R, snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents,
            relational,
            snapshot_dir: snapshot_dir.into(),
        }
    }

    /// Returns every event document. Blocking.
    pub fn fetch_events(&self) -> FetchResult<Vec<Event>> {
        self.fetch_collection(EntityType::Events, EVENTS_COLLECTION)
    }

    /// Returns every account document. Blocking.
    pub fn fetch_accounts(&self) -> FetchResult<Vec<Account>> {
        self.fetch_collection(EntityType::Accounts, ACCOUNTS_COLLECTION)
    }

    /// Returns users, rooms and messages, each ordered by creation time.
    pub async fn fetch_relational_bundle(&self) -> FetchResult<RelationalBundle> {
        let entity = EntityType::RelationalBundle;
        let started_at = Instant::now();

        let users = self
            .relational
            .list_users()
            .await
            .map_err(|err| self.fail(FetchError::new(entity, "users", err)))?;
        let rooms = self
            .relational
            .list_rooms()
            .await
            .map_err(|err| self.fail(FetchError::new(entity, "rooms", err)))?;
        let messages = self
            .relational
            .list_messages()
            .await
            .map_err(|err| self.fail(FetchError::new(entity, "messages", err)))?;

        let bundle = RelationalBundle {
            users,
            rooms,
            messages,
        };
        info!(
            "event=fetch module=service status=ok entity={} users={} rooms={} messages={} duration_ms={}",
            entity.as_str(),
            bundle.users.len(),
            bundle.rooms.len(),
            bundle.messages.len(),
            started_at.elapsed().as_millis()
        );
        self.snapshot(entity, &bundle);
        Ok(bundle)
    }

    fn fetch_collection<T>(&self, entity: EntityType, collection: &'static str) -> FetchResult<Vec<T>>
    where
        T: DeserializeOwned + Serialize,
    {
        let started_at = Instant::now();
        let documents = self
            .documents
            .find(collection, &DocumentFilter::All)
            .map_err(|err| self.fail(FetchError::new(entity, collection, err)))?;

        let records = documents
            .into_iter()
            .map(|doc| {
                serde_json::from_value::<T>(Value::Object(doc)).map_err(|err| {
                    StoreError::DecodeFailed(format!("{collection} document: {err}"))
                })
            })
            .collect::<Result<Vec<T>, StoreError>>()
            .map_err(|err| self.fail(FetchError::new(entity, collection, err)))?;

        info!(
            "event=fetch module=service status=ok entity={} found={} duration_ms={}",
            entity.as_str(),
            records.len(),
            started_at.elapsed().as_millis()
        );
        self.snapshot(entity, &records);
        Ok(records)
    }

    fn snapshot<T: Serialize + ?Sized>(&self, entity: EntityType, data: &T) {
        if let Err(err) = write_snapshot(data, entity.snapshot_prefix(), &self.snapshot_dir) {
            warn!(
                "event=snapshot_write module=service status=error entity={} error={}",
                entity.as_str(),
                err
            );
        }
    }

    fn fail(&self, err: FetchError) -> FetchError {
        error!(
            "event=fetch module=service status=error entity={} target={} error_code={} error={}",
            err.entity.as_str(),
            err.target,
            err.source.kind(),
            err.source
        );
        err
    }
}
