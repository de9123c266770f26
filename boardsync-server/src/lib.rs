//! `BoardSync` dashboard server library.
//!
//! Exposes the HTTP command API and the WebSocket push channel for use in
//! tests and embedding. The server holds all board and chat state in
//! memory; every accepted mutation is rebroadcast to the owning team's
//! push room, including to the client that issued it.

pub mod config;
pub mod http;
pub mod push;
pub mod rooms;
pub mod state;

use std::sync::Arc;

use state::AppState;

/// Starts the server on the given address and returns the bound address
/// and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(AppState::new())).await
}

/// Starts the server with a pre-configured [`AppState`].
///
/// This is the entry point used by both `main.rs` and test code; tests
/// seed users and tasks on the state before starting.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}
