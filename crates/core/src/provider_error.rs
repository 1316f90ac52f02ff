// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider error taxonomy and retry policy.
//!
//! Errors surfaced by outbound agent calls are classified into a small set
//! of kinds so the engines can make retry decisions without knowing the
//! transport.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    RateLimit,
    Auth,
    ContextOverflow,
    Timeout,
    ToolError,
    Network,
    Abort,
    Overloaded,
    Unknown,
}

impl ProviderErrorKind {
    /// Whether an error of this kind is worth retrying at all.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimit
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::Network
                | ProviderErrorKind::Overloaded
        )
    }
}

/// A classified failure from an agent call.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), retryable: kind.retryable(), retry_after_ms: None }
    }

    pub fn aborted() -> Self {
        Self::new(ProviderErrorKind::Abort, "call aborted")
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(ProviderErrorKind::Timeout, format!("timed out after {}s", after.as_secs()))
    }

    pub fn with_retry_after_ms(mut self, ms: u64) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }
}

/// Map an HTTP status (plus optional Retry-After milliseconds) to an error.
pub fn classify_http_status(status: u16, retry_after_ms: Option<u64>) -> ProviderError {
    let kind = match status {
        401 | 403 => ProviderErrorKind::Auth,
        429 => ProviderErrorKind::RateLimit,
        529 => ProviderErrorKind::Overloaded,
        s if s >= 500 => ProviderErrorKind::Network,
        _ => ProviderErrorKind::Unknown,
    };
    let mut err = ProviderError::new(kind, format!("HTTP {status}"));
    if kind == ProviderErrorKind::RateLimit {
        if let Some(ms) = retry_after_ms {
            err = err.with_retry_after_ms(ms);
        }
    }
    err
}

/// Initial retry backoff.
pub const RETRY_INITIAL: Duration = Duration::from_secs(2);
/// Backoff cap.
pub const RETRY_CAP: Duration = Duration::from_secs(30);
/// Default maximum attempts.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Delay before retry `attempt` (0-based): exponential, factor 2, capped.
///
/// A `retry_after_ms` hint from the error overrides the computed delay.
pub fn retry_delay(attempt: u32, error: &ProviderError) -> Duration {
    if let Some(ms) = error.retry_after_ms {
        return Duration::from_millis(ms);
    }
    let factor = 2u64.saturating_pow(attempt);
    let secs = RETRY_INITIAL.as_secs().saturating_mul(factor).min(RETRY_CAP.as_secs());
    Duration::from_secs(secs)
}

#[cfg(test)]
#[path = "provider_error_tests.rs"]
mod tests;
