//! Typed entities exposed by the `/view/*` endpoints.
//!
//! Document-store entities decode leniently: a missing field takes its zero
//! value (empty string, 0, false, Unix epoch). A present field of the wrong
//! type fails decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event document from the `events` collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub object_id: String,
    /// Secondary id kept by the event producer; distinct from `_id`.
    pub id: String,
    /// Stored as text upstream; never parsed here.
    pub price: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub max_people: i64,
    pub total_people: i64,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "__v")]
    pub version: i64,
}

/// Account document from the `accounts` collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id")]
    pub object_id: String,
    pub email: String,
    pub password: String,
    /// Ids of events the account holds tickets for.
    pub events: Vec<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "__v")]
    pub version: i64,
}

/// Row of `message_system.users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Row of `message_system.rooms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub room_name: String,
    pub created_at: DateTime<Utc>,
}

/// Row of `message_system.messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub room_id: String,
    pub user_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Combined payload of `/view/postgres-data`.
///
/// Empty tables serialize as `[]`, never `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationalBundle {
    pub users: Vec<User>,
    pub rooms: Vec<Room>,
    pub messages: Vec<Message>,
}
