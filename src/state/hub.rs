//! The Hub - central shared state for the relay.
//!
//! One Hub per process, shared by every connection task and HTTP handler.
//! It owns the connection registry and subscription table, the session
//! directory, and the durable store handle, and it implements the presence
//! lifecycle around them.

use crate::auth::SessionDirectory;
use crate::db::Database;
use crate::state::{ConnectionHandle, ConnectionRegistry, SubscriptionTable};
use dashmap::DashMap;
use parley_proto::{GroupId, ServerFrame, UserId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Central shared state container.
pub struct Hub {
    /// Live connections by user id.
    pub registry: ConnectionRegistry,

    /// Live group subscriptions.
    pub subscriptions: SubscriptionTable,

    /// Token-to-identity resolution for incoming connections.
    pub sessions: SessionDirectory,

    /// Durable store.
    pub db: Database,

    /// Group capacity, enforced at join time only.
    pub max_group_members: i64,

    /// Per-group join serialization, so a capacity check and the insert it
    /// guards cannot interleave with a concurrent join.
    join_locks: DashMap<GroupId, Arc<Mutex<()>>>,
}

impl Hub {
    pub fn new(db: Database, sessions: SessionDirectory, max_group_members: i64) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            subscriptions: SubscriptionTable::new(),
            sessions,
            db,
            max_group_members,
            join_locks: DashMap::new(),
        }
    }

    /// Register a connection and flip the user online.
    ///
    /// Replaces any previous handle for the user; the superseded
    /// connection's outbound queue closes when the returned handle drops,
    /// which ends its task. Everyone connected (the user included) gets a
    /// status frame.
    pub async fn connect(&self, user_id: UserId, handle: ConnectionHandle) {
        if let Some(old) = self.registry.register(user_id, handle) {
            info!(user_id, old_conn = %old.conn_id(), "Connection superseded by a newer login");
        }

        if let Err(e) = self.db.users().set_online(user_id, true).await {
            warn!(user_id, error = %e, "Failed to persist online flag");
        }

        self.registry
            .broadcast(&ServerFrame::Status {
                user_id,
                online: true,
            })
            .await;
    }

    /// Tear down a connection's runtime state.
    ///
    /// Only acts when `conn_id` still owns the registry entry: a late close
    /// from a superseded connection leaves the newer login's presence and
    /// subscriptions alone.
    pub async fn disconnect(&self, user_id: UserId, conn_id: Uuid) {
        if !self.registry.unregister(user_id, conn_id) {
            debug!(user_id, %conn_id, "Stale disconnect ignored");
            return;
        }

        self.subscriptions.unsubscribe_all(user_id);

        if let Err(e) = self.db.users().set_online(user_id, false).await {
            warn!(user_id, error = %e, "Failed to persist offline flag");
        }

        self.registry
            .broadcast(&ServerFrame::Status {
                user_id,
                online: false,
            })
            .await;
    }

    /// Push a frame to one user if they are online. Returns whether the
    /// frame was handed to a live connection.
    pub async fn send_to_user(&self, user_id: UserId, frame: ServerFrame) -> bool {
        match self.registry.lookup(user_id) {
            Some(handle) => handle.send(frame).await,
            None => false,
        }
    }

    /// The join lock for a group.
    pub fn join_lock(&self, group_id: GroupId) -> Arc<Mutex<()>> {
        self.join_locks
            .entry(group_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
