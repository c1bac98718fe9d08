//! Connection - handles one authenticated client connection.
//!
//! Each connection runs in its own task around a `tokio::select!` loop:
//! inbound text frames are decoded and dispatched to the router, outbound
//! frames arrive over an mpsc queue whose sender lives in the connection
//! registry. When a newer login replaces this connection's registry entry
//! the queue closes, which ends the loop; the final guarded disconnect
//! then recognizes the handle is no longer ours and leaves the newer
//! login's state alone.

use crate::router;
use crate::state::{ConnectionHandle, Hub};
use futures_util::{SinkExt, StreamExt};
use parley_proto::{ClientFrame, UserId};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Outbound queue depth per connection.
const OUTBOUND_QUEUE: usize = 64;

/// A client connection handler.
pub struct Connection {
    user_id: UserId,
    conn_id: Uuid,
    hub: Arc<Hub>,
}

impl Connection {
    pub fn new(user_id: UserId, hub: Arc<Hub>) -> Self {
        Self {
            user_id,
            conn_id: Uuid::new_v4(),
            hub,
        }
    }

    /// Run the connection until the peer closes, errors, or is superseded.
    #[instrument(skip(self, ws), fields(user_id = self.user_id, conn_id = %self.conn_id), name = "connection")]
    pub async fn run(self, ws: WebSocketStream<TcpStream>) -> anyhow::Result<()> {
        let (mut sink, mut stream) = ws.split();
        let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE);

        self.hub
            .connect(self.user_id, ConnectionHandle::new(self.conn_id, tx))
            .await;
        info!("Client connected");

        let mut superseded = false;

        loop {
            tokio::select! {
                outbound = rx.recv() => {
                    match outbound {
                        Some(frame) => {
                            let text = match frame.encode() {
                                Ok(text) => text,
                                Err(e) => {
                                    warn!(error = %e, "Dropping unencodable frame");
                                    continue;
                                }
                            };
                            if let Err(e) = sink.send(WsMessage::Text(text)).await {
                                debug!(error = %e, "Write failed, closing");
                                break;
                            }
                        }
                        // Every sender is gone: the registry entry was
                        // replaced by a newer login.
                        None => {
                            info!("Superseded by a newer connection");
                            superseded = true;
                            break;
                        }
                    }
                }

                inbound = stream.next() => {
                    match inbound {
                        Some(Ok(WsMessage::Text(text))) => {
                            match ClientFrame::decode(&text) {
                                Ok(frame) => {
                                    router::dispatch(&self.hub, self.user_id, frame).await;
                                }
                                // Malformed frames are logged and dropped;
                                // the connection stays open.
                                Err(e) => {
                                    warn!(error = %e, "Dropping malformed frame");
                                }
                            }
                        }
                        Some(Ok(WsMessage::Ping(payload))) => {
                            let _ = sink.send(WsMessage::Pong(payload)).await;
                        }
                        Some(Ok(WsMessage::Close(_))) => {
                            debug!("Peer sent close");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Binary and pong frames carry nothing for us.
                        }
                        Some(Err(e)) => {
                            debug!(error = %e, "Read error, closing");
                            break;
                        }
                        None => {
                            debug!("Peer disconnected");
                            break;
                        }
                    }
                }
            }
        }

        if superseded {
            // Best-effort goodbye to the stale socket; the replacement owns
            // the registry entry now.
            let _ = sink.send(WsMessage::Close(None)).await;
        }

        self.hub.disconnect(self.user_id, self.conn_id).await;
        info!("Client disconnected");
        Ok(())
    }
}
