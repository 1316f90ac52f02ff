// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-account health records.
//!
//! `status` is always derived from the other fields; callers never set it
//! directly. Derivation rules are ordered; the first match wins.

use serde::{Deserialize, Serialize};

/// Error count at or above which an account is critical.
pub const CRITICAL_ERROR_COUNT: u32 = 5;

/// Default staleness threshold for last activity (10 minutes).
pub const DEFAULT_STALE_AFTER_MS: u64 = 10 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Critical => "critical",
        }
    }
}

/// Health aggregate for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountHealth {
    pub account: String,
    pub status: HealthStatus,
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<u64>,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub rate_limited: bool,
    #[serde(default)]
    pub sla_violations: u32,
    pub updated_at: u64,
}

/// Partial update merged into an [`AccountHealth`] record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthUpdate {
    pub connected: Option<bool>,
    pub last_activity: Option<u64>,
    pub error_count: Option<u32>,
    pub rate_limited: Option<bool>,
    pub sla_violations: Option<u32>,
}

impl AccountHealth {
    /// Seed a record with defaults: disconnected, no history.
    pub fn seed(account: impl Into<String>, now: u64) -> Self {
        Self {
            account: account.into(),
            status: HealthStatus::Critical,
            connected: false,
            last_activity: None,
            error_count: 0,
            rate_limited: false,
            sla_violations: 0,
            updated_at: now,
        }
    }

    /// Merge a partial update and recompute the derived status.
    pub fn apply(&mut self, update: &HealthUpdate, now: u64) {
        if let Some(connected) = update.connected {
            self.connected = connected;
        }
        if let Some(last) = update.last_activity {
            self.last_activity = Some(last);
        }
        if let Some(errors) = update.error_count {
            self.error_count = errors;
        }
        if let Some(limited) = update.rate_limited {
            self.rate_limited = limited;
        }
        if let Some(violations) = update.sla_violations {
            self.sla_violations = violations;
        }
        self.updated_at = now;
        self.status = derive_status(self, now, DEFAULT_STALE_AFTER_MS);
    }
}

/// Pure status derivation. Rules in order, first match wins.
pub fn derive_status(health: &AccountHealth, now: u64, stale_after_ms: u64) -> HealthStatus {
    if !health.connected {
        return HealthStatus::Critical;
    }
    if health.rate_limited {
        return HealthStatus::Critical;
    }
    if health.error_count >= CRITICAL_ERROR_COUNT {
        return HealthStatus::Critical;
    }
    if health.error_count > 0 {
        return HealthStatus::Degraded;
    }
    if health.sla_violations > 0 {
        return HealthStatus::Degraded;
    }
    if let Some(last) = health.last_activity {
        if now.saturating_sub(last) > stale_after_ms {
            return HealthStatus::Degraded;
        }
    }
    HealthStatus::Healthy
}

/// Fleet-wide health rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAggregate {
    pub overall: HealthStatus,
    pub healthy: usize,
    pub degraded: usize,
    pub critical: usize,
    pub total: usize,
    pub accounts: Vec<AccountHealth>,
}

impl HealthAggregate {
    pub fn from_accounts(accounts: Vec<AccountHealth>) -> Self {
        let healthy = accounts.iter().filter(|a| a.status == HealthStatus::Healthy).count();
        let degraded = accounts.iter().filter(|a| a.status == HealthStatus::Degraded).count();
        let critical = accounts.iter().filter(|a| a.status == HealthStatus::Critical).count();
        let overall = if critical > 0 {
            HealthStatus::Critical
        } else if degraded > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        Self { overall, healthy, degraded, critical, total: accounts.len(), accounts }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
