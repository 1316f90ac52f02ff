// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, background loops, shutdown.

mod startup;

pub use startup::{shutdown, startup, StartupResult};

use std::sync::Arc;
use std::time::Duration;

use hub_core::{HubConfig, SystemClock};
use hub_engine::{
    CouncilEngine, EventBus, HealthChecker, HealthMonitor, ResponseAction, SharedSessionManager,
    SlaCoordinator, VerificationEngine,
};
use hub_store::{MessageStore, TaskStore, TrustStore};
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::TokenStore;
use crate::registry::ConnectionRegistry;

/// Shared daemon context for request handlers and background loops.
pub struct HubState {
    pub config: HubConfig,
    pub bus: EventBus,
    pub messages: MessageStore,
    pub tasks: TaskStore,
    pub trust: TrustStore,
    pub health: Arc<HealthMonitor<SystemClock>>,
    pub sessions: SharedSessionManager<SystemClock>,
    pub sla: SlaCoordinator,
    pub council: CouncilEngine,
    pub verifier: VerificationEngine,
    pub registry: ConnectionRegistry,
    pub tokens: TokenStore,
    pub clock: SystemClock,
    pub shutdown: Arc<Notify>,
}

/// Errors from daemon startup and shutdown.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] hub_core::ConfigError),

    #[error(transparent)]
    Store(#[from] hub_store::StoreError),

    #[error("another daemon already holds the lock")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket {0}: {1}")]
    BindFailed(std::path::PathBuf, #[source] std::io::Error),
}

/// Trust penalty applied when an agent is quarantined.
const QUARANTINE_TRUST_DELTA: i64 = -10;

/// SLA evaluation cadence.
const SLA_EVAL_INTERVAL: Duration = Duration::from_secs(60);

/// Session staleness sweep cadence.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Inactive sessions older than this are purged.
const SESSION_PURGE_AGE_MS: u64 = 24 * 60 * 60 * 1000;

/// Spawn the daemon's timer-driven loops: SLA evaluation, health probing
/// and session cleanup. All loops stop when `cancel` fires.
pub fn spawn_background(
    state: Arc<HubState>,
    checker: Arc<HealthChecker<SystemClock>>,
    cancel: CancellationToken,
) {
    // SLA loop
    {
        let state = Arc::clone(&state);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SLA_EVAL_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => run_sla_round(&state),
                    _ = cancel.cancelled() => break,
                }
            }
        });
    }

    // Health checker loop
    {
        let registry = state.registry.clone();
        let health = Arc::clone(&state.health);
        let cancel = cancel.clone();
        let accounts = Arc::new(move || {
            let mut list = registry.connected_accounts();
            for known in health.known_accounts() {
                if !list.contains(&known) {
                    list.push(known);
                }
            }
            list
        });
        tokio::spawn(checker.run(accounts, cancel));
    }

    // Session sweeper
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let stale = state.sessions.cleanup_stale();
                        if !stale.is_empty() {
                            debug!(count = stale.len(), "marked stale sessions inactive");
                        }
                        state.sessions.purge_inactive(SESSION_PURGE_AGE_MS);
                    }
                    _ = cancel.cancelled() => break,
                }
            }
        });
    }
}

/// One SLA evaluation round: snapshot the board, emit an event per action,
/// apply trust penalties for quarantines and nudge pinged assignees.
pub fn run_sla_round(state: &HubState) {
    use hub_core::Clock;

    let now = state.clock.epoch_ms();
    let snapshot: Vec<hub_engine::TaskSla> =
        state.tasks.in_progress().iter().map(hub_engine::TaskSla::from_task).collect();
    let rejections = state.tasks.consecutive_rejections();
    let actions = state.sla.evaluate(&snapshot, &rejections, now);

    for action in actions {
        let emitted = state.bus.emit_kind("SLA_ACTION", &action);
        match &action {
            ResponseAction::QuarantineAgent { account, reason } => {
                if let Err(err) =
                    state.trust.apply_delta(account, QUARANTINE_TRUST_DELTA, reason, now)
                {
                    tracing::warn!(%account, error = %err, "failed to apply quarantine penalty");
                }
                info!(%account, %reason, "agent quarantined");
            }
            ResponseAction::Ping { task_id } => {
                if let Some(task) = state.tasks.get(task_id) {
                    if let Some(assignee) = task.assignee {
                        state
                            .registry
                            .notify(&assignee, hub_wire::Reply::StreamEvent { event: emitted });
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
