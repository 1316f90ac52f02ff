// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic health checker.
//!
//! Drives a user-supplied probe against every known account on a timer.
//! Probes for distinct accounts run in parallel with a per-probe timeout;
//! a tick that starts while the previous tick is still running is skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hub_core::{kinds, Clock, HealthStatus, HealthUpdate};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bus::EventBus;
use crate::health::HealthMonitor;

/// Result of probing one account.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeResult {
    pub ok: bool,
    pub latency_ms: u64,
}

/// A liveness probe for one account (e.g. a cheap provider call).
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self, account: &str) -> ProbeResult;
}

/// Hook invoked when a probe leaves an account critical.
pub type CriticalHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Serialize)]
struct HealthEvent<'a> {
    agent: &'a str,
    status: &'a str,
    #[serde(rename = "latencyMs")]
    latency_ms: u64,
}

/// Periodic prober over the fleet.
pub struct HealthChecker<C: Clock> {
    monitor: Arc<HealthMonitor<C>>,
    bus: EventBus,
    probe: Arc<dyn HealthProbe>,
    interval: Duration,
    probe_timeout: Duration,
    on_critical: Option<CriticalHook>,
    in_flight: AtomicBool,
}

impl<C: Clock> HealthChecker<C> {
    pub fn new(
        monitor: Arc<HealthMonitor<C>>,
        bus: EventBus,
        probe: Arc<dyn HealthProbe>,
        interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            monitor,
            bus,
            probe,
            interval,
            probe_timeout,
            on_critical: None,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_on_critical(mut self, hook: CriticalHook) -> Self {
        self.on_critical = Some(hook);
        self
    }

    /// Run one round of probes, all accounts concurrently. Returns false
    /// when the previous round was still in flight and this one was
    /// skipped.
    pub async fn tick(&self, accounts: Vec<String>) -> bool {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("health tick skipped: previous round still running");
            return false;
        }

        let probes = accounts.iter().map(|account| self.probe_one(account.as_str()));
        futures_util::future::join_all(probes).await;

        self.in_flight.store(false, Ordering::SeqCst);
        true
    }

    async fn probe_one(&self, account: &str) {
        let result =
            match tokio::time::timeout(self.probe_timeout, self.probe.check(account)).await {
                Ok(result) => result,
                Err(_) => {
                    ProbeResult { ok: false, latency_ms: self.probe_timeout.as_millis() as u64 }
                }
            };

        let updated = self.monitor.update(
            account,
            HealthUpdate { connected: Some(result.ok), ..Default::default() },
        );
        let health = if result.ok { self.monitor.touch(account) } else { updated };

        self.bus.emit_kind(
            kinds::ACCOUNT_HEALTH,
            &HealthEvent {
                agent: account,
                status: health.status.as_str(),
                latency_ms: result.latency_ms,
            },
        );

        if health.status == HealthStatus::Critical {
            if let Some(hook) = &self.on_critical {
                hook(account);
            }
        }
    }

    /// Timer loop: probe every interval until cancelled. The account list
    /// is re-read from the supplier each round.
    pub async fn run(
        self: Arc<Self>,
        accounts: Arc<dyn Fn() -> Vec<String> + Send + Sync>,
        cancel: CancellationToken,
    ) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let list = accounts();
                    // Skip-on-overlap happens inside tick(); spawn so a
                    // slow round never delays the timer itself.
                    let checker = Arc::clone(&self);
                    tokio::spawn(async move {
                        checker.tick(list).await;
                    });
                }
                _ = cancel.cancelled() => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "checker_tests.rs"]
mod tests;
