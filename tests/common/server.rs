//! Test server management.
//!
//! Spawns and manages parleyd instances for integration testing.

use std::process::{Child, Command};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// A test server instance. The relay listens on `ws_port`, the HTTP
/// facade on `ws_port + 1`. Killed (and its data wiped) on drop.
pub struct TestServer {
    child: Child,
    ws_port: u16,
    http_port: u16,
    _data_dir: TempDir,
}

impl TestServer {
    /// Spawn a test server with the default group capacity.
    pub async fn spawn(ws_port: u16) -> anyhow::Result<Self> {
        Self::spawn_with_capacity(ws_port, 10).await
    }

    /// Spawn a test server with a custom group capacity.
    pub async fn spawn_with_capacity(ws_port: u16, max_group_members: i64) -> anyhow::Result<Self> {
        let http_port = ws_port + 1;
        let data_dir = tempfile::tempdir()?;

        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "test.relay"

[listen]
address = "127.0.0.1:{ws_port}"

[http]
address = "127.0.0.1:{http_port}"

[database]
path = "{db_path}"

[limits]
max_group_members = {max_group_members}

[[sessions]]
token = "alice-token"
username = "alice"

[[sessions]]
token = "bob-token"
username = "bob"

[[sessions]]
token = "carol-token"
username = "carol"

[[sessions]]
token = "mallory-token"
username = "mallory"
"#,
            db_path = data_dir.path().join("relay.db").display(),
        );
        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_parleyd"))
            .arg(&config_path)
            .spawn()?;

        let server = Self {
            child,
            ws_port,
            http_port,
            _data_dir: data_dir,
        };

        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until both listeners accept connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for port in [self.ws_port, self.http_port] {
            let mut ready = false;
            for _ in 0..50 {
                if tokio::net::TcpStream::connect(("127.0.0.1", port))
                    .await
                    .is_ok()
                {
                    ready = true;
                    break;
                }
                sleep(Duration::from_millis(100)).await;
            }
            if !ready {
                anyhow::bail!("server failed to open port {port} within 5 seconds");
            }
        }
        Ok(())
    }

    /// Relay (WebSocket) address.
    pub fn ws_address(&self) -> String {
        format!("127.0.0.1:{}", self.ws_port)
    }

    /// HTTP facade base URL.
    pub fn http_base(&self) -> String {
        format!("http://127.0.0.1:{}", self.http_port)
    }

    /// Connect a WebSocket test client using the given session token.
    pub async fn connect(&self, token: &str) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.ws_address(), token).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
