//! Store clients for the document and relational backends.
//!
//! # Responsibility
//! - Define the read-only contracts the scanner and fetch service depend on.
//! - Keep driver details (SQL, pipelines, pools, JSON paths) behind those
//!   contracts.
//! - Classify driver failures into `StoreError` kinds.
//!
//! # Invariants
//! - Nothing in this module mutates stored data on behalf of a read.
//! - Store handles are passed in explicitly; there are no process globals.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod backend;
pub mod document_store;
pub mod mongo_store;
pub mod relational_store;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store failure classified by what the caller can do about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection, ping, timeout or lock failure.
    Unavailable(String),
    /// The store rejected a well-formed query.
    QueryFailed(String),
    /// A stored record could not be decoded.
    DecodeFailed(String),
}

impl StoreError {
    /// Stable error code used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "store_unavailable",
            Self::QueryFailed(_) => "query_failed",
            Self::DecodeFailed(_) => "decode_failed",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
            Self::QueryFailed(message) => write!(f, "query failed: {message}"),
            Self::DecodeFailed(message) => write!(f, "decode failed: {message}"),
        }
    }
}

impl Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        let message = value.to_string();
        match &value {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                ErrorCode::CannotOpen
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
                | ErrorCode::PermissionDenied => Self::Unavailable(message),
                _ => Self::QueryFailed(message),
            },
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::Utf8Error(_) => Self::DecodeFailed(message),
            _ => Self::QueryFailed(message),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => err.into(),
            other @ DbError::UnsupportedSchemaVersion { .. } => {
                Self::Unavailable(other.to_string())
            }
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(value: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        let message = value.to_string();
        match value.kind.as_ref() {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::Authentication { .. } => Self::Unavailable(message),
            ErrorKind::BsonDeserialization(_) => Self::DecodeFailed(message),
            _ => Self::QueryFailed(message),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        let message = value.to_string();
        match &value {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(message),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::TypeNotFound { .. } => Self::DecodeFailed(message),
            _ => Self::QueryFailed(message),
        }
    }
}
