//! Relational store contract and PostgreSQL implementation.
//!
//! # Invariants
//! - Each list query is ordered by `created_at`.
//! - A query that fails outright returns an error; a single row that fails
//!   to decode is logged and dropped.
//! - Every query is bounded by the configured timeout.

use crate::config::RelationalSettings;
use crate::model::entity::{Message, Room, User};
use crate::store::{StoreError, StoreResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{info, warn};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

const USERS_SQL: &str = "SELECT user_id, email, created_at
FROM message_system.users
ORDER BY created_at";

const ROOMS_SQL: &str = "SELECT room_id, room_name, created_at
FROM message_system.rooms
ORDER BY created_at";

const MESSAGES_SQL: &str = "SELECT message_id, room_id, user_id, message, created_at
FROM message_system.messages
ORDER BY created_at";

const MAX_POOL_CONNECTIONS: u32 = 8;

/// Read-only access to the messaging tables.
pub trait RelationalStore {
    fn list_users(&self) -> impl Future<Output = StoreResult<Vec<User>>> + Send;
    fn list_rooms(&self) -> impl Future<Output = StoreResult<Vec<Room>>> + Send;
    fn list_messages(&self) -> impl Future<Output = StoreResult<Vec<Message>>> + Send;
}

/// PostgreSQL-backed relational store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgRelationalStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgRelationalStore {
    /// Connects the pool and verifies the server answers.
    pub async fn connect(
        settings: &RelationalSettings,
        query_timeout: Duration,
    ) -> StoreResult<Self> {
        let store = Self::connect_lazy(settings, query_timeout);
        store.ping().await?;
        info!(
            "event=pg_connect module=store status=ok host={} port={} database={}",
            settings.host, settings.port, settings.database
        );
        Ok(store)
    }

    /// Builds the pool without opening a connection.
    pub fn connect_lazy(settings: &RelationalSettings, query_timeout: Duration) -> Self {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database)
            .ssl_mode(settings.ssl_mode);
        let pool = PgPoolOptions::new()
            .max_connections(MAX_POOL_CONNECTIONS)
            .acquire_timeout(query_timeout)
            .connect_lazy_with(options);
        Self::from_pool(pool, query_timeout)
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Runs `SELECT 1` within the query timeout.
    pub async fn ping(&self) -> StoreResult<()> {
        let ping = sqlx::query("SELECT 1").execute(&self.pool);
        match tokio::time::timeout(self.query_timeout, ping).await {
            Ok(result) => result.map(|_| ()).map_err(|err| match StoreError::from(err) {
                StoreError::QueryFailed(message) | StoreError::DecodeFailed(message) => {
                    StoreError::Unavailable(message)
                }
                unavailable => unavailable,
            }),
            Err(_) => Err(StoreError::Unavailable(format!(
                "ping timed out after {}ms",
                self.query_timeout.as_millis()
            ))),
        }
    }

    async fn fetch_rows(&self, table: &'static str, sql: &'static str) -> StoreResult<Vec<PgRow>> {
        let query = sqlx::query(sql).fetch_all(&self.pool);
        match tokio::time::timeout(self.query_timeout, query).await {
            Ok(rows) => Ok(rows?),
            Err(_) => Err(StoreError::Unavailable(format!(
                "{table} query timed out after {}ms",
                self.query_timeout.as_millis()
            ))),
        }
    }
}

impl RelationalStore for PgRelationalStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = self.fetch_rows("users", USERS_SQL).await?;
        Ok(decode_rows("users", &rows, decode_user))
    }

    async fn list_rooms(&self) -> StoreResult<Vec<Room>> {
        let rows = self.fetch_rows("rooms", ROOMS_SQL).await?;
        Ok(decode_rows("rooms", &rows, decode_room))
    }

    async fn list_messages(&self) -> StoreResult<Vec<Message>> {
        let rows = self.fetch_rows("messages", MESSAGES_SQL).await?;
        Ok(decode_rows("messages", &rows, decode_message))
    }
}

/// Decodes every row, dropping the ones that fail.
pub fn decode_rows<R, T>(
    table: &str,
    rows: &[R],
    decode: impl Fn(&R) -> Result<T, sqlx::Error>,
) -> Vec<T> {
    let mut decoded = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match decode(row) {
            Ok(record) => decoded.push(record),
            Err(err) => warn!(
                "event=row_decode module=store status=skipped table={table} row_index={index} error={err}"
            ),
        }
    }
    decoded
}

fn decode_user(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        user_id: text_column(row, "user_id")?,
        email: row.try_get("email")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn decode_room(row: &PgRow) -> Result<Room, sqlx::Error> {
    Ok(Room {
        room_id: text_column(row, "room_id")?,
        room_name: row.try_get("room_name")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn decode_message(row: &PgRow) -> Result<Message, sqlx::Error> {
    Ok(Message {
        message_id: text_column(row, "message_id")?,
        room_id: text_column(row, "room_id")?,
        user_id: text_column(row, "user_id")?,
        message: row.try_get("message")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

/// Id columns may be `text`/`varchar` or `uuid`.
fn text_column(row: &PgRow, column: &str) -> Result<String, sqlx::Error> {
    match row.try_get::<String, _>(column) {
        Ok(value) => Ok(value),
        Err(text_err) => match row.try_get::<Uuid, _>(column) {
            Ok(id) => Ok(id.to_string()),
            Err(_) => Err(text_err),
        },
    }
}

/// `timestamptz` decodes directly; plain `timestamp` is read as UTC.
fn timestamp_column(row: &PgRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    match row.try_get::<DateTime<Utc>, _>(column) {
        Ok(value) => Ok(value),
        Err(tz_err) => match row.try_get::<NaiveDateTime, _>(column) {
            Ok(naive) => Ok(naive.and_utc()),
            Err(_) => Err(tz_err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::decode_rows;

    #[test]
    fn decode_rows_drops_only_failing_rows() {
        let rows = vec!["1", "x", "3"];
        let decoded = decode_rows("users", &rows, |raw| {
            raw.parse::<i64>()
                .map_err(|err| sqlx::Error::Decode(Box::new(err)))
        });
        assert_eq!(decoded, vec![1, 3]);
    }
}
