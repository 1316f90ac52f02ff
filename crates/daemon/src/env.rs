// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.
//!
//! Read once at process start; everything downstream takes paths and
//! timeouts from [`hub_core::HubConfig`].

use std::path::PathBuf;
use std::time::Duration;

/// Hub directory override: `CLAUDE_HUB_DIR`.
pub fn hub_dir_override() -> Option<PathBuf> {
    std::env::var_os("CLAUDE_HUB_DIR").map(PathBuf::from)
}

/// Per-request timeout for simple (non-council) requests.
pub fn request_timeout() -> Duration {
    std::env::var("HUB_REQUEST_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(2))
}

/// Per-request timeout for council runs.
pub fn council_timeout() -> Duration {
    std::env::var("HUB_COUNCIL_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10 * 60))
}
