//! Frame unions for the relay protocol.
//!
//! Frames are internally tagged by `type`. Unknown tags fail to decode and
//! the relay treats that as a malformed frame: logged and dropped, never a
//! reason to close the connection. Inbound payload fields are optional at
//! the decoding layer; each handler checks its own preconditions so that a
//! frame missing a field is ignored rather than rejected with an error.

use crate::model::{DirectMessage, Group, GroupMessage};
use serde::{Deserialize, Serialize};

/// Frames a client may send to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Send a direct message.
    Message {
        #[serde(default)]
        receiver_id: Option<i64>,
        #[serde(default)]
        content: Option<String>,
    },
    /// Confirm delivery of a message back to its sender.
    Delivered {
        #[serde(default)]
        message_id: Option<i64>,
        #[serde(default)]
        sender_id: Option<i64>,
    },
    /// Mark everything from `sender_id` to the caller as read.
    Read {
        #[serde(default)]
        sender_id: Option<i64>,
    },
    /// Post a message to a group.
    GroupMessage {
        #[serde(default)]
        group_id: Option<i64>,
        #[serde(default)]
        content: Option<String>,
    },
    /// Join a group by its address and subscribe for live fan-out.
    JoinGroup {
        #[serde(default)]
        group_address: Option<String>,
    },
}

/// Frames the relay pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// A direct message, pushed to the receiver and echoed to the sender
    /// with its authoritative id.
    Message { message: DirectMessage },
    /// Delivery acknowledgement for a previously sent message.
    Delivered { message_id: i64 },
    /// Read receipt: `reader_id` has read the recipient's messages.
    Read { reader_id: i64 },
    /// Presence change for a user.
    Status { user_id: i64, online: bool },
    /// A group message fanned out to live subscribers.
    GroupMessage { message: GroupMessage, group_id: i64 },
    /// Successful join, carrying the group details.
    GroupJoined { group: Group },
    /// Full persisted history of a group, sent after a join.
    GroupMessages {
        group_id: i64,
        messages: Vec<GroupMessage>,
    },
    /// An operation failed in a way the client should see.
    Error { message: String },
}

impl ClientFrame {
    /// Decode one inbound frame from its JSON text.
    pub fn decode(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

impl ServerFrame {
    /// Encode this frame as JSON text for the wire.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
