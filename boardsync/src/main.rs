//! `boardsync` — headless board synchronization client.
//!
//! Connects to a dashboard server, joins a team's push room, and mirrors
//! one project board locally, printing every board change to stdout.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/boardsync/config.toml`).
//!
//! ```bash
//! boardsync --api-url http://localhost:3000/api \
//!     --token "$TOKEN" --team team-1 --project p1 \
//!     --user-id u-1 --email me@example.com
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use boardsync::api::http::HttpCommandClient;
use boardsync::board::{self, BoardCommand, BoardEvent};
use boardsync::config::{CliArgs, ClientConfig};
use boardsync::conn::ConnectionManager;
use boardsync::session::Identity;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!("boardsync starting");

    match run(config).await {
        Ok(()) => {
            tracing::info!("boardsync exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ClientConfig) -> Result<(), String> {
    let api_url = config
        .api_url
        .as_deref()
        .ok_or("no API URL configured (--api-url)")?;
    let token = config.token.clone().unwrap_or_default();
    let team = config
        .team
        .clone()
        .ok_or("no team configured (--team)")?;
    let project = config
        .project
        .clone()
        .ok_or("no project configured (--project)")?;

    let identity = Identity {
        id: config.user_id.clone().unwrap_or_default(),
        email: config.email.clone(),
        name: None,
    };

    let api = Arc::new(HttpCommandClient::new(api_url, token.clone()));

    let push_url = config.push_endpoint().map_err(|e| e.to_string())?;
    let (conn, conn_rx) = ConnectionManager::new(push_url, token, config.reconnect.clone());
    let conn = Arc::new(conn);
    if let Err(e) = conn.connect().await {
        // The board still works over HTTP; it just won't see live pushes.
        tracing::warn!(err = %e, "push channel unavailable, continuing without live updates");
        eprintln!("warning: push channel unavailable ({e})");
    }

    let (cmd_tx, mut evt_rx) =
        board::spawn_board(api, Arc::clone(&conn), conn_rx, identity, config.role);

    cmd_tx
        .send(BoardCommand::OpenProject {
            team_id: team,
            project_id: project,
        })
        .await
        .map_err(|_| "board engine exited before start".to_string())?;

    loop {
        tokio::select! {
            event = evt_rx.recv() => match event {
                Some(event) => print_event(&event),
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, shutting down");
                let _ = cmd_tx.send(BoardCommand::Shutdown).await;
                conn.disconnect().await;
                return Ok(());
            }
        }
    }
}

fn print_event(event: &BoardEvent) {
    match event {
        BoardEvent::BoardChanged(board) => {
            println!(
                "board: {} todo / {} in progress / {} done",
                board.todo.len(),
                board.in_progress.len(),
                board.done.len()
            );
            for task in board
                .todo
                .iter()
                .chain(&board.in_progress)
                .chain(&board.done)
            {
                println!("  [{}] {} ({})", task.status.label(), task.title, task.id);
            }
        }
        BoardEvent::ChatChanged(messages) => {
            if let Some(last) = messages.last() {
                println!("chat ({} messages, latest): {}", messages.len(), last.content);
            }
        }
        BoardEvent::Notice(text) => println!("notice: {text}"),
        BoardEvent::PermissionWarning(text) => println!("warning: {text}"),
        BoardEvent::CommandFailed(text) => println!("failed: {text}"),
        BoardEvent::ConnectionStatus(state) => println!("connection: {state}"),
    }
}

/// Initialize logging to a file when `--log-file` is given, else stderr.
///
/// A `--log-file` path with no usable name component (such as `/`) falls
/// back to stderr rather than running without a subscriber. Returns a
/// [`WorkerGuard`] that must be held until shutdown so buffered entries
/// are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if let Some(path) = file_path {
        if let Some((dir, file_name)) = split_log_path(path) {
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_writer(non_blocking)
                .with_env_filter(env_filter)
                .with_ansi(false)
                .init();
            return Some(guard);
        }
        eprintln!(
            "warning: unusable log file path {}, logging to stderr",
            path.display()
        );
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();
    None
}

/// Splits a log file path into the directory and file name the appender
/// needs. `None` when the path has no name component.
fn split_log_path(path: &Path) -> Option<(&Path, &str)> {
    let dir = path.parent()?;
    let file_name = path.file_name()?.to_str()?;
    Some((dir, file_name))
}
