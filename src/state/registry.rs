//! Connection registry: the authority on who is online right now.
//!
//! Maps a user id to exactly one live connection handle. A reconnect
//! replaces the previous handle; unregistration only succeeds when the
//! caller still owns the registered handle, so a superseded connection's
//! late close can never evict its replacement.

use dashmap::DashMap;
use parley_proto::{ServerFrame, UserId};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Handle to one live connection: the volatile connection id plus the
/// sender feeding its outbound queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    conn_id: Uuid,
    tx: mpsc::Sender<ServerFrame>,
}

impl ConnectionHandle {
    pub fn new(conn_id: Uuid, tx: mpsc::Sender<ServerFrame>) -> Self {
        Self { conn_id, tx }
    }

    /// The volatile id of the connection behind this handle.
    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    /// Queue a frame for this connection. Returns false when the peer is
    /// gone; callers treat that as a skipped delivery, never an error.
    pub async fn send(&self, frame: ServerFrame) -> bool {
        self.tx.send(frame).await.is_ok()
    }
}

/// Process-wide map from user id to live connection handle.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: DashMap<UserId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user, returning the handle it replaced
    /// (if any). Dropping the returned handle closes the superseded
    /// connection's outbound queue, which terminates its task.
    pub fn register(&self, user_id: UserId, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        self.entries.insert(user_id, handle)
    }

    /// Remove the entry for `user_id`, but only if it still belongs to
    /// `conn_id`. Returns whether an entry was removed.
    pub fn unregister(&self, user_id: UserId, conn_id: Uuid) -> bool {
        self.entries
            .remove_if(&user_id, |_, handle| handle.conn_id == conn_id)
            .is_some()
    }

    /// Look up the live handle for a user.
    pub fn lookup(&self, user_id: UserId) -> Option<ConnectionHandle> {
        self.entries.get(&user_id).map(|e| e.value().clone())
    }

    /// Whether a user has a live connection.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.entries.contains_key(&user_id)
    }

    /// Push a frame to every live connection. Works on a snapshot so the
    /// map is never locked across an await; a failed send is skipped and
    /// the rest still get the frame.
    pub async fn broadcast(&self, frame: &ServerFrame) {
        let targets: Vec<(UserId, ConnectionHandle)> = self
            .entries
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();

        for (user_id, handle) in targets {
            if !handle.send(frame.clone()).await {
                debug!(user_id, "Broadcast target vanished, skipping");
            }
        }
    }
}
