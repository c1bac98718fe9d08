//! Runtime state: the connection registry, the group subscription table,
//! and the Hub that ties them to the durable store.
//!
//! Everything here is rebuilt from scratch on process restart; nothing is
//! persisted.

mod hub;
mod registry;
mod subscriptions;

pub use hub::Hub;
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use subscriptions::SubscriptionTable;
