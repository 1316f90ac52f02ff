// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hub Daemon (hubd)
//!
//! Coordination daemon for a fleet of agent accounts: authenticated Unix
//! socket server, message/task stores, event bus, health and SLA loops,
//! council deliberation.
//!
//! `hubd` runs the daemon; `hubd --supervise` runs a supervisor that
//! restarts the daemon on crash with capped backoff.

use std::io::Write;
use std::sync::Arc;

use hub_core::HubConfig;
use hub_daemon::lifecycle::{self, StartupResult};
use hub_daemon::listener::Listener;
use hub_daemon::{caller, env, supervisor};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut supervise = false;
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--supervise" => supervise = true,
            "--version" | "-V" | "-v" => {
                println!("hubd {VERSION}");
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("hubd {VERSION}");
                println!("Hub daemon - coordination server for agent accounts");
                println!();
                println!("USAGE:");
                println!("    hubd [--supervise]");
                println!();
                println!("The daemon listens on <HUB_DIR>/hub.sock (HUB_DIR from");
                println!("CLAUDE_HUB_DIR, default ~/.claude-hub). With --supervise it");
                println!("runs as a parent process that restarts the daemon on crash.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: hubd [--supervise | --help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = HubConfig::load(env::hub_dir_override())?;

    if supervise {
        let _log_guard = setup_logging(&config)?;
        info!("supervisor starting");
        let pid_path = config.paths.pid_path.clone();
        return supervisor::supervise(&pid_path, supervisor::spawn_daemon_child)
            .await
            .map_err(Into::into);
    }

    rotate_log_if_needed(&config.paths.log_path);
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!(hub_dir = %config.paths.hub_dir.display(), "starting hub daemon");

    let StartupResult { state, listener, checker, lock_file } = match lifecycle::startup(
        config,
        Arc::new(caller::NoTransportCaller),
        None,
    )
    .await
    {
        Ok(result) => result,
        Err(lifecycle::LifecycleError::LockFailed(_)) => {
            eprintln!("hubd is already running");
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let cancel = CancellationToken::new();
    lifecycle::spawn_background(Arc::clone(&state), checker, cancel.clone());
    tokio::spawn(Listener::new(listener, Arc::clone(&state)).run(cancel.clone()));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %state.config.paths.socket_path.display(), "daemon ready");
    println!("READY");

    tokio::select! {
        _ = state.shutdown.notified() => info!("shutdown requested via command"),
        _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("received SIGINT, shutting down..."),
    }

    cancel.cancel();
    lifecycle::shutdown(&state);
    drop(lock_file);
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log at startup when it has grown too large.
/// Best-effort: rotation failures never block startup.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker written synchronously before tracing is up, so tooling
/// can find where this attempt begins in the log.
fn write_startup_marker(config: &HubConfig) -> std::io::Result<()> {
    if let Some(parent) = config.paths.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.paths.log_path)?;
    writeln!(
        file,
        "--- hubd: starting (pid: {}, at: {}) ---\n",
        std::process::id(),
        chrono::Utc::now().to_rfc3339(),
    )
}

fn setup_logging(
    config: &HubConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let parent = config
        .paths
        .log_path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad log path"))?;
    std::fs::create_dir_all(parent)?;
    let file_name = config
        .paths
        .log_path
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad log path"))?;

    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
