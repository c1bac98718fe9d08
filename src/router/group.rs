//! Group handlers: joining by address and member-gated fan-out.

use crate::error::{HandlerError, HandlerResult};
use crate::state::Hub;
use parley_proto::{ServerFrame, UserId};
use std::sync::Arc;
use tracing::debug;

/// Handle an inbound `group_message` frame.
///
/// Authorization is against durable membership in the store, not the
/// subscription table: a member who never re-joined this session can still
/// post. Fan-out goes to the live subscribers only.
pub(super) async fn group_message(
    hub: &Arc<Hub>,
    sender_id: UserId,
    group_id: Option<i64>,
    content: Option<String>,
) -> HandlerResult {
    let group_id = group_id.ok_or(HandlerError::MissingField("groupId"))?;
    let content = content.ok_or(HandlerError::MissingField("content"))?;

    if !hub.db.groups().is_member(group_id, sender_id).await? {
        return Err(HandlerError::NotAMember);
    }

    let message = hub
        .db
        .groups()
        .create_message(group_id, sender_id, &content)
        .await?;

    for subscriber in hub.subscriptions.members_of(group_id) {
        let delivered = hub
            .send_to_user(
                subscriber,
                ServerFrame::GroupMessage {
                    message: message.clone(),
                    group_id,
                },
            )
            .await;
        if !delivered {
            debug!(subscriber, group_id, "Subscriber offline, skipping fan-out");
        }
    }

    Ok(())
}

/// Handle an inbound `join_group` frame.
///
/// Resolution order: address lookup, capacity, membership. The capacity
/// check and the membership insert hold the group's join lock so that
/// racing joins cannot push a group past its limit. The reply is the group
/// details followed by the full persisted history.
pub(super) async fn join_group(
    hub: &Arc<Hub>,
    user_id: UserId,
    group_address: Option<String>,
) -> HandlerResult {
    let address = group_address.ok_or(HandlerError::MissingField("groupAddress"))?;

    let group = hub
        .db
        .groups()
        .find_by_address(&address)
        .await?
        .ok_or(HandlerError::GroupNotFound)?;

    {
        let lock = hub.join_lock(group.id);
        let _guard = lock.lock().await;

        if hub.db.groups().member_count(group.id).await? >= hub.max_group_members {
            return Err(HandlerError::GroupFull);
        }

        if !hub.db.groups().is_member(group.id, user_id).await? {
            hub.db.groups().add_member(group.id, user_id).await?;
        }
    }

    hub.subscriptions.subscribe(group.id, user_id);

    let history = hub.db.groups().list_messages(group.id).await?;

    hub.send_to_user(
        user_id,
        ServerFrame::GroupJoined {
            group: group.clone(),
        },
    )
    .await;
    hub.send_to_user(
        user_id,
        ServerFrame::GroupMessages {
            group_id: group.id,
            messages: history,
        },
    )
    .await;

    Ok(())
}
