//! Frame router: the protocol state machine behind every open connection.
//!
//! Each inbound frame is decoded once at the transport boundary into the
//! tagged [`ClientFrame`] union, then dispatched here. Handlers check their
//! own preconditions, talk to the store, and push frames to live
//! connections through the Hub. A handler error never closes the
//! connection; the dispatcher logs it and, where warranted, sends an
//! `error` frame back to the caller.

mod direct;
mod group;

use crate::state::Hub;
use parley_proto::{ClientFrame, UserId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dispatch one inbound frame from `user_id`'s connection.
pub async fn dispatch(hub: &Arc<Hub>, user_id: UserId, frame: ClientFrame) {
    let result = match frame {
        ClientFrame::Message {
            receiver_id,
            content,
        } => direct::message(hub, user_id, receiver_id, content).await,
        ClientFrame::Delivered {
            message_id,
            sender_id,
        } => direct::delivered(hub, message_id, sender_id).await,
        ClientFrame::Read { sender_id } => direct::read(hub, user_id, sender_id).await,
        ClientFrame::GroupMessage { group_id, content } => {
            group::group_message(hub, user_id, group_id, content).await
        }
        ClientFrame::JoinGroup { group_address } => {
            group::join_group(hub, user_id, group_address).await
        }
    };

    if let Err(e) = result {
        match e.to_error_frame() {
            Some(reply) => {
                warn!(user_id, code = e.error_code(), error = %e, "Frame handling failed");
                if !hub.send_to_user(user_id, reply).await {
                    debug!(user_id, "Caller went offline before the error reply");
                }
            }
            // Silent by contract: a missing field or a non-member post is
            // dropped, the connection stays open.
            None => debug!(user_id, code = e.error_code(), error = %e, "Frame dropped"),
        }
    }
}
