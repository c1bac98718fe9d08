//! Group subscription table.
//!
//! Tracks which users want live fan-out for which groups. Disjoint from
//! durable membership: a member without an open connection has no
//! subscription, and a subscription always implies prior membership
//! because it is only created on a successful join.

use dashmap::DashMap;
use parley_proto::{GroupId, UserId};
use std::collections::HashSet;

/// Process-wide map from group id to the set of subscribed user ids.
#[derive(Default)]
pub struct SubscriptionTable {
    groups: DashMap<GroupId, HashSet<UserId>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a user to a group's live fan-out. Subscribing twice is a
    /// no-op; the set holds each user at most once.
    pub fn subscribe(&self, group_id: GroupId, user_id: UserId) {
        self.groups.entry(group_id).or_default().insert(user_id);
    }

    /// Drop a user from every group's subscription set. Sets that become
    /// empty are removed entirely.
    pub fn unsubscribe_all(&self, user_id: UserId) {
        self.groups.retain(|_, subscribers| {
            subscribers.remove(&user_id);
            !subscribers.is_empty()
        });
    }

    /// Snapshot of the subscribers for a group.
    pub fn members_of(&self, group_id: GroupId) -> Vec<UserId> {
        self.groups
            .get(&group_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

}
