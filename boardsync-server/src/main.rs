//! `BoardSync` dashboard server -- in-memory command API plus push fan-out.
//!
//! An axum server exposing the JSON task and chat API under `/api` and
//! the WebSocket push endpoint at `/push`. State is held in memory and
//! lost on restart.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:3000
//! cargo run --bin boardsync-server
//!
//! # Custom address, accounts seeded from a config file
//! cargo run --bin boardsync-server -- --bind 127.0.0.1:8080 \
//!     --config ./server.toml
//! ```

use std::sync::Arc;

use clap::Parser;

use boardsync_server::config::{ServerCliArgs, ServerConfig};
use boardsync_server::state::{Account, AppState};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting boardsync server");

    let state = Arc::new(AppState::new());
    for entry in &config.accounts {
        state
            .add_account(
                &entry.token,
                Account {
                    id: entry.id.clone(),
                    name: entry.name.clone(),
                    email: entry.email.clone(),
                    role: entry.role,
                },
            )
            .await;
        tracing::info!(user_id = %entry.id, role = ?entry.role, "seeded account");
    }
    if config.accounts.is_empty() {
        tracing::warn!("no accounts configured; every request will be unauthorized");
    }

    match boardsync_server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
