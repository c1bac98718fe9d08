//! Unified error handling for the relay.
//!
//! Frame handlers report `HandlerError`; the dispatcher decides which of
//! those become a client-visible `error` frame and which are dropped with
//! only a log line. HTTP handlers report `ApiError`, which renders as a
//! status code plus a JSON body.

use crate::db::DbError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parley_proto::ServerFrame;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// Handler errors (frame processing)
// ============================================================================

/// Errors that can occur while handling an inbound frame.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A required frame field was absent. The frame is ignored without a
    /// reply.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("group not found")]
    GroupNotFound,

    #[error("group is full")]
    GroupFull,

    /// The caller is not a durable member of the group they posted to.
    /// Dropped without a reply.
    #[error("not a group member")]
    NotAMember,

    #[error(transparent)]
    Db(#[from] DbError),
}

impl HandlerError {
    /// Static error code for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::GroupNotFound => "group_not_found",
            Self::GroupFull => "group_full",
            Self::NotAMember => "not_a_member",
            Self::Db(_) => "store_error",
        }
    }

    /// Convert to a client-visible error frame.
    ///
    /// Returns `None` for errors that are intentionally silent (missing
    /// fields, non-member group posts).
    pub fn to_error_frame(&self) -> Option<ServerFrame> {
        let message = match self {
            Self::MissingField(_) | Self::NotAMember => return None,
            Self::GroupNotFound => "Group not found",
            Self::GroupFull => "Group is full",
            Self::Db(_) => "Storage error",
        };
        Some(ServerFrame::Error {
            message: message.to_string(),
        })
    }
}

/// Result type for frame handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// API errors (HTTP facade)
// ============================================================================

/// Errors surfaced by the HTTP facade.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing auth token")]
    MissingToken,

    #[error("invalid auth token")]
    InvalidToken,

    #[error("not a member of this group")]
    Forbidden,

    #[error("group not found")]
    GroupNotFound,

    #[error("group address already taken")]
    AddressTaken,

    #[error(transparent)]
    Db(DbError),
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::AddressTaken(_) => ApiError::AddressTaken,
            other => ApiError::Db(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingToken => (StatusCode::UNAUTHORIZED, "No auth token found".to_string()),
            ApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid auth token".to_string()),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You are not a member of this group".to_string(),
            ),
            ApiError::GroupNotFound => (StatusCode::NOT_FOUND, "Group not found".to_string()),
            ApiError::AddressTaken => (
                StatusCode::CONFLICT,
                "Group address already taken".to_string(),
            ),
            ApiError::Db(e) => {
                tracing::error!(error = %e, "Store failure in HTTP handler");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
