// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor mode: run the daemon as a child and restart it on crash.
//!
//! Backoff doubles from 2 s to a 30 s cap. Five failed starts inside one
//! window give up and surface the failure to the operator.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

/// Initial restart delay.
pub const BACKOFF_INITIAL: Duration = Duration::from_secs(2);
/// Restart delay cap.
pub const BACKOFF_CAP: Duration = Duration::from_secs(30);
/// Crashes tolerated within [`CRASH_WINDOW`] before giving up.
pub const MAX_CRASHES: u32 = 5;
/// Window over which crashes are counted.
pub const CRASH_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Restart delay for the given consecutive-crash count (1-based).
pub fn backoff_delay(crash_count: u32) -> Duration {
    let factor = 2u64.saturating_pow(crash_count.saturating_sub(1));
    BACKOFF_INITIAL.saturating_mul(factor.min(u64::from(u32::MAX)) as u32).min(BACKOFF_CAP)
}

/// Remove a PID file whose process is no longer alive.
///
/// Liveness is a zero-signal probe; a live daemon's PID file is left
/// untouched. Returns whether a stale file was removed.
pub fn remove_stale_pid_file(pid_path: &Path) -> bool {
    let Ok(raw) = std::fs::read_to_string(pid_path) else {
        return false;
    };
    let Ok(pid) = raw.trim().parse::<i32>() else {
        // Unparseable PID files are stale by definition.
        let _ = std::fs::remove_file(pid_path);
        return true;
    };
    if process_alive(pid) {
        return false;
    }
    warn!(pid, "removing stale PID file");
    let _ = std::fs::remove_file(pid_path);
    true
}

fn process_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid), None).is_ok()
}

/// Run the daemon binary as a supervised child, restarting on crash.
///
/// `spawn` starts one daemon run and resolves to its exit status; the
/// supervisor owns backoff and the stale-PID sweep. Returns `Ok(())` on a
/// clean child exit, `Err` after giving up.
pub async fn supervise<F, Fut>(pid_path: &Path, mut spawn: F) -> Result<(), SuperviseError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::io::Result<std::process::ExitStatus>>,
{
    let mut crashes: Vec<Instant> = Vec::new();

    loop {
        remove_stale_pid_file(pid_path);

        let started = Instant::now();
        let status = spawn().await.map_err(SuperviseError::Spawn)?;

        if status.success() {
            info!("daemon exited cleanly, supervisor done");
            return Ok(());
        }

        let now = Instant::now();
        // A long healthy run clears the crash history.
        if now.duration_since(started) > CRASH_WINDOW {
            crashes.clear();
        }
        crashes.push(now);
        crashes.retain(|at| now.duration_since(*at) <= CRASH_WINDOW);

        let crash_count = crashes.len() as u32;
        if crash_count >= MAX_CRASHES {
            error!(crashes = crash_count, "daemon keeps crashing, giving up");
            return Err(SuperviseError::TooManyCrashes { crashes: crash_count });
        }

        let delay = backoff_delay(crash_count);
        warn!(status = %status, delay_secs = delay.as_secs(), "daemon crashed, restarting");
        tokio::time::sleep(delay).await;
    }
}

/// Supervisor failures.
#[derive(Debug, thiserror::Error)]
pub enum SuperviseError {
    #[error("failed to spawn daemon: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("daemon crashed {crashes} times within the window")]
    TooManyCrashes { crashes: u32 },
}

/// Spawn one run of the daemon binary (the current executable without
/// `--supervise`).
pub async fn spawn_daemon_child() -> std::io::Result<std::process::ExitStatus> {
    let exe = std::env::current_exe()?;
    tokio::process::Command::new(exe).status().await
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
