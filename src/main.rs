//! parleyd - the Parley messaging relay.
//!
//! A single-process relay for direct and group chat: authenticated
//! WebSocket connections, live presence, delivered/read acknowledgement,
//! durable history in SQLite, and an HTTP facade for history and group
//! management.

mod api;
mod auth;
mod config;
mod db;
mod error;
mod network;
mod router;
mod state;

use crate::auth::SessionDirectory;
use crate::config::Config;
use crate::db::Database;
use crate::network::Gateway;
use crate::state::Hub;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(server = %config.server.name, "Starting parleyd");

    // Initialize database
    let db_path = config
        .database
        .as_ref()
        .map(|d| d.path.as_str())
        .unwrap_or("parley.db");
    let db = Database::new(db_path).await?;

    // Presence is rebuilt from live connections; flags persisted by a
    // previous process must not leak into the user listing.
    db.users().set_all_offline().await?;

    // Seed static sessions, creating their users on first boot.
    let sessions = SessionDirectory::new();
    for block in &config.sessions {
        let user = match db.users().get_by_username(&block.username).await? {
            Some(user) => user,
            None => db.users().create(&block.username).await?,
        };
        sessions.grant(&block.token, user.id);
    }
    if !config.sessions.is_empty() {
        info!(count = config.sessions.len(), "Seeded static sessions");
    }

    // Create the Hub (shared state)
    let hub = Arc::new(Hub::new(db, sessions, config.limits.max_group_members));

    // Start the HTTP facade on its own task
    {
        let hub = Arc::clone(&hub);
        let addr = config.http.address;
        tokio::spawn(async move {
            api::serve(addr, hub).await;
        });
    }

    // Start the relay gateway
    let gateway = Gateway::bind(config.listen.address, hub).await?;
    gateway.run().await
}
