//! Entity models carried by frames and returned by the HTTP API.
//!
//! Timestamps are unix milliseconds. Field names serialize in camelCase to
//! match the wire format.

use serde::{Deserialize, Serialize};

/// A registered user. The `online` flag mirrors the live connection table
/// and is only meaningful while the process that produced it is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub online: bool,
}

/// A direct message between two users.
///
/// `delivered` flips at most once, on live hand-off to the receiver's
/// connection. `read` flips at most once, via the bulk read paths. The two
/// flags are independent: a message can be read without ever having been
/// delivered live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub sent_at: i64,
    pub delivered: bool,
    pub read: bool,
}

/// A chat group. The address is a human-chosen slug, unique across the
/// store and immutable; it is how clients discover and join the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub admin_id: i64,
    pub created_at: i64,
}

/// A message posted to a group. Fire-and-forget: no delivery or read
/// tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessage {
    pub id: i64,
    pub group_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub sent_at: i64,
}
