//! Direct message handlers: send, delivery acknowledgement, read receipts.

use crate::error::{HandlerError, HandlerResult};
use crate::state::Hub;
use parley_proto::{ServerFrame, UserId};
use std::sync::Arc;
use tracing::debug;

/// Handle an inbound `message` frame.
///
/// The message is persisted before any delivery attempt, so a crash
/// between the two loses only the live notification. When the receiver is
/// online the hand-off flips the delivered flag and the sender gets a
/// `delivered` ack; either way the sender receives the echoed message with
/// its store-assigned id.
pub(super) async fn message(
    hub: &Arc<Hub>,
    sender_id: UserId,
    receiver_id: Option<i64>,
    content: Option<String>,
) -> HandlerResult {
    let receiver_id = receiver_id.ok_or(HandlerError::MissingField("receiverId"))?;
    let content = content.ok_or(HandlerError::MissingField("content"))?;

    let mut message = hub
        .db
        .messages()
        .create(sender_id, receiver_id, &content)
        .await?;

    if let Some(receiver) = hub.registry.lookup(receiver_id) {
        hub.db.messages().mark_delivered(receiver_id).await?;
        message.delivered = true;

        if receiver
            .send(ServerFrame::Message {
                message: message.clone(),
            })
            .await
        {
            hub.send_to_user(
                sender_id,
                ServerFrame::Delivered {
                    message_id: message.id,
                },
            )
            .await;
        } else {
            debug!(receiver_id, "Receiver closed during hand-off");
        }
    }

    hub.send_to_user(sender_id, ServerFrame::Message { message })
        .await;
    Ok(())
}

/// Handle an inbound `delivered` frame: relay the acknowledgement to the
/// message's original sender. No-op when they are offline.
pub(super) async fn delivered(
    hub: &Arc<Hub>,
    message_id: Option<i64>,
    sender_id: Option<i64>,
) -> HandlerResult {
    let message_id = message_id.ok_or(HandlerError::MissingField("messageId"))?;
    let sender_id = sender_id.ok_or(HandlerError::MissingField("senderId"))?;

    hub.send_to_user(sender_id, ServerFrame::Delivered { message_id })
        .await;
    Ok(())
}

/// Handle an inbound `read` frame: bulk-mark everything from `sender_id`
/// to the reader as read and tell the sender who read it.
pub(super) async fn read(
    hub: &Arc<Hub>,
    reader_id: UserId,
    sender_id: Option<i64>,
) -> HandlerResult {
    let sender_id = sender_id.ok_or(HandlerError::MissingField("senderId"))?;

    hub.db.messages().mark_read(sender_id, reader_id).await?;

    hub.send_to_user(sender_id, ServerFrame::Read { reader_id })
        .await;
    Ok(())
}
