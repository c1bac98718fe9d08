//! WebSocket test client.

use anyhow::{bail, Context};
use futures_util::{SinkExt, StreamExt};
use parley_proto::{ClientFrame, ServerFrame};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Default patience for a single expected frame.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A test client holding one relay connection.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect and authenticate with a session token.
    pub async fn connect(addr: &str, token: &str) -> anyhow::Result<Self> {
        let url = format!("ws://{addr}/?token={token}");
        let (ws, _) = connect_async(url).await.context("websocket connect")?;
        Ok(Self { ws })
    }

    /// Send a protocol frame.
    pub async fn send(&mut self, frame: &ClientFrame) -> anyhow::Result<()> {
        let text = serde_json::to_string(frame)?;
        self.ws.send(WsMessage::Text(text)).await?;
        Ok(())
    }

    /// Send raw text, for exercising the malformed-frame path.
    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(WsMessage::Text(text.to_string())).await?;
        Ok(())
    }

    /// Receive the next protocol frame, skipping transport noise.
    pub async fn recv(&mut self) -> anyhow::Result<ServerFrame> {
        loop {
            match self.ws.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(_)) => continue,
                Some(Err(e)) => bail!("read error: {e}"),
                None => bail!("connection closed"),
            }
        }
    }

    /// Receive with an explicit timeout.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> anyhow::Result<ServerFrame> {
        tokio::time::timeout(timeout, self.recv())
            .await
            .context("timed out waiting for a frame")?
    }

    /// Receive frames until one matches the predicate, discarding the rest
    /// (presence broadcasts arrive interleaved with everything).
    pub async fn expect<F>(&mut self, mut pred: F) -> anyhow::Result<ServerFrame>
    where
        F: FnMut(&ServerFrame) -> bool,
    {
        let deadline = Instant::now() + RECV_TIMEOUT;
        loop {
            let now = Instant::now();
            if now >= deadline {
                bail!("no matching frame before timeout");
            }
            let frame = self.recv_timeout(deadline - now).await?;
            if pred(&frame) {
                return Ok(frame);
            }
        }
    }

    /// Assert that nothing but presence chatter arrives within `window`.
    pub async fn expect_silence(&mut self, window: Duration) -> anyhow::Result<()> {
        let deadline = Instant::now() + window;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            match tokio::time::timeout(deadline - now, self.recv()).await {
                Err(_) => return Ok(()),
                // Status broadcasts arrive on their own schedule.
                Ok(Ok(ServerFrame::Status { .. })) => continue,
                Ok(Ok(frame)) => bail!("expected silence, got {frame:?}"),
                Ok(Err(e)) => bail!("connection failed while expecting silence: {e}"),
            }
        }
    }

    /// Close the connection.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
