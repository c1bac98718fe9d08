//! HTTP facade: history retrieval and group management.
//!
//! Thin request handlers over the same Hub the relay uses, which is what
//! lets the history endpoint push a live read receipt to the other side of
//! a conversation. Every route requires a bearer token resolvable through
//! the session directory.

use crate::error::ApiError;
use crate::state::Hub;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use parley_proto::{DirectMessage, Group, GroupMessage, ServerFrame, User, UserId};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header.
pub struct Caller(pub UserId);

#[async_trait::async_trait]
impl FromRequestParts<Arc<Hub>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, hub: &Arc<Hub>) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .ok_or(ApiError::MissingToken)?
            .to_str()
            .map_err(|_| ApiError::InvalidToken)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::InvalidToken)?;

        hub.sessions
            .resolve(token)
            .map(Caller)
            .ok_or(ApiError::InvalidToken)
    }
}

/// Build the facade router.
pub fn router(hub: Arc<Hub>) -> Router {
    Router::new()
        .route("/messages/:user_id", get(get_messages))
        .route("/users", get(list_users))
        .route("/groups", post(create_group))
        .route("/groups/me", get(my_groups))
        // Route params at the same position must share a name; both
        // handlers read a single segment, one as an address, one as an id.
        .route("/groups/:group", get(group_by_address))
        .route("/groups/:group/messages", get(group_messages))
        .with_state(hub)
}

/// Serve the facade on `addr`. Long-running; spawn it next to the gateway.
pub async fn serve(addr: SocketAddr, hub: Arc<Hub>) {
    let app = router(hub);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "Failed to bind HTTP listener");
            return;
        }
    };
    info!(%addr, "HTTP facade listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "HTTP server error");
    }
}

/// GET /messages/:user_id
///
/// Conversation history with another user, chronological. Fetching marks
/// the other-to-caller direction read, and a live counterpart gets the
/// read receipt pushed over their connection immediately.
async fn get_messages(
    Caller(caller): Caller,
    Path(other): Path<i64>,
    State(hub): State<Arc<Hub>>,
) -> Result<Json<Vec<DirectMessage>>, ApiError> {
    let messages = hub.db.messages().between(caller, other).await?;

    hub.db.messages().mark_read(other, caller).await?;

    if !hub
        .send_to_user(other, ServerFrame::Read { reader_id: caller })
        .await
    {
        debug!(other, "Counterpart offline, read receipt not pushed");
    }

    Ok(Json(messages))
}

/// GET /users - everyone except the caller, with live online flags.
async fn list_users(
    Caller(caller): Caller,
    State(hub): State<Arc<Hub>>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = hub
        .db
        .users()
        .list()
        .await?
        .into_iter()
        .filter(|u| u.id != caller)
        .map(|mut u| {
            // The registry is the authority; the stored flag can lag a
            // connect that is mid-flight.
            u.online = hub.registry.is_online(u.id);
            u
        })
        .collect();

    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub address: String,
}

/// POST /groups - create a group; the caller becomes its admin.
async fn create_group(
    Caller(caller): Caller,
    State(hub): State<Arc<Hub>>,
    Json(body): Json<CreateGroupRequest>,
) -> Result<Json<Group>, ApiError> {
    let group = hub
        .db
        .groups()
        .create(&body.name, &body.address, caller)
        .await?;
    info!(group_id = group.id, address = %group.address, admin = caller, "Group created");
    Ok(Json(group))
}

/// GET /groups/me - groups the caller belongs to.
async fn my_groups(
    Caller(caller): Caller,
    State(hub): State<Arc<Hub>>,
) -> Result<Json<Vec<Group>>, ApiError> {
    Ok(Json(hub.db.groups().groups_for(caller).await?))
}

/// GET /groups/:group - look up a group by its address.
async fn group_by_address(
    Caller(_): Caller,
    Path(address): Path<String>,
    State(hub): State<Arc<Hub>>,
) -> Result<Json<Group>, ApiError> {
    hub.db
        .groups()
        .find_by_address(&address)
        .await?
        .map(Json)
        .ok_or(ApiError::GroupNotFound)
}

/// GET /groups/:group/messages - full history, members only.
async fn group_messages(
    Caller(caller): Caller,
    Path(group_id): Path<i64>,
    State(hub): State<Arc<Hub>>,
) -> Result<Json<Vec<GroupMessage>>, ApiError> {
    if !hub.db.groups().is_member(group_id, caller).await? {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(hub.db.groups().list_messages(group_id).await?))
}
