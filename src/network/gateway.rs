//! Gateway - accepts incoming relay connections.
//!
//! Binds the WebSocket listener and spawns one Connection task per client.
//! Authentication happens during the HTTP upgrade: the handshake callback
//! resolves the caller's session token, and an unresolvable token rejects
//! the upgrade with 401 before a connection ever opens.

use crate::network::Connection;
use crate::state::Hub;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, error, info};

/// The Gateway accepts incoming WebSocket connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    hub: Arc<Hub>,
}

impl Gateway {
    /// Bind the gateway to the specified address.
    pub async fn bind(addr: SocketAddr, hub: Arc<Hub>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Relay listener bound");
        Ok(Self { listener, hub })
    }

    /// Run the gateway, accepting connections forever.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let hub = Arc::clone(&self.hub);
                    tokio::spawn(async move {
                        if let Err(e) = accept_client(stream, addr, hub).await {
                            debug!(%addr, error = %e, "Connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Drive one raw TCP stream through handshake, registration and the frame
/// loop.
async fn accept_client(stream: TcpStream, addr: SocketAddr, hub: Arc<Hub>) -> anyhow::Result<()> {
    let mut authed = None;

    let ws = {
        let sessions = &hub.sessions;
        let callback = |req: &http::Request<()>, response: http::Response<()>| {
            match bearer_token(req).and_then(|token| sessions.resolve(&token)) {
                Some(user_id) => {
                    authed = Some(user_id);
                    Ok(response)
                }
                None => {
                    info!(%addr, "Rejecting unauthenticated connection");
                    Err(http::Response::builder()
                        .status(http::StatusCode::UNAUTHORIZED)
                        .body(Some("invalid or missing session token".to_string()))
                        .unwrap_or_default())
                }
            }
        };
        accept_hdr_async(stream, callback).await?
    };

    let Some(user_id) = authed else {
        anyhow::bail!("handshake completed without an identity");
    };

    // The session may outlive the account it points at; an unknown
    // identity never gets past the door.
    if hub.db.users().get(user_id).await?.is_none() {
        anyhow::bail!("session resolved to unknown user {user_id}");
    }

    info!(%addr, user_id, "WebSocket handshake successful");
    Connection::new(user_id, Arc::clone(&hub)).run(ws).await
}

/// Extract the session token from an upgrade request: `token` query
/// parameter first, `Authorization: Bearer` header as the fallback.
fn bearer_token(req: &http::Request<()>) -> Option<String> {
    if let Some(query) = req.uri().query() {
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("token=") {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    req.headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}
