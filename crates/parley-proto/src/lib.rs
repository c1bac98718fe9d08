//! # parley-proto
//!
//! Wire protocol for the Parley messaging relay.
//!
//! Everything that crosses a connection is a single JSON object per
//! WebSocket text frame, discriminated by a `type` tag. This crate defines
//! the client-to-server and server-to-client frame unions plus the entity
//! models they carry, so the daemon and any Rust client agree on the wire
//! format by construction.
//!
//! ## Quick start
//!
//! ```rust
//! use parley_proto::{ClientFrame, ServerFrame};
//!
//! let frame = ClientFrame::decode(r#"{"type":"message","receiverId":2,"content":"hi"}"#)
//!     .expect("valid frame");
//! assert!(matches!(frame, ClientFrame::Message { .. }));
//!
//! let status = ServerFrame::Status { user_id: 2, online: true };
//! assert_eq!(status.encode().unwrap(), r#"{"type":"status","userId":2,"online":true}"#);
//! ```

mod frame;
mod model;

pub use frame::{ClientFrame, ServerFrame};
pub use model::{DirectMessage, Group, GroupMessage, User};

/// Stable user identity, assigned by the durable store.
pub type UserId = i64;

/// Group identity, assigned by the durable store.
pub type GroupId = i64;

/// Message identity, assigned by the durable store.
pub type MessageId = i64;
