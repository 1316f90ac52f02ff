// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.

use std::io::Write;
use std::sync::Arc;

use fs2::FileExt;
use hub_core::{config::seed_settings, HubConfig, SystemClock};
use hub_engine::{
    AgentCaller, CouncilEngine, EventBus, HealthChecker, HealthMonitor, HealthProbe, ProbeResult,
    SharedSessionManager, SlaCoordinator, VerificationEngine,
};
use hub_store::{open_db, MessageStore, ResultCache, Store, TaskStore, TrustStore};
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::info;

use super::{HubState, LifecycleError};
use crate::auth::TokenStore;
use crate::registry::ConnectionRegistry;

/// Everything `main` needs after a successful startup.
pub struct StartupResult {
    pub state: Arc<HubState>,
    pub listener: UnixListener,
    pub checker: Arc<HealthChecker<SystemClock>>,
    /// Held for the daemon's lifetime; releasing it frees the singleton lock.
    pub lock_file: std::fs::File,
}

/// Probe that treats a connected account as healthy.
///
/// Used when no provider-level probe is registered: connectivity over the
/// hub socket is the daemon's best local liveness signal.
struct RegistryProbe {
    registry: ConnectionRegistry,
}

#[async_trait::async_trait]
impl HealthProbe for RegistryProbe {
    async fn check(&self, account: &str) -> ProbeResult {
        ProbeResult { ok: self.registry.is_connected(account), latency_ms: 0 }
    }
}

/// Start the daemon: acquire the lock, open stores, bind the socket.
///
/// `caller` is the outbound agent transport for council runs; `probe`
/// overrides the default connectivity probe when provided.
pub async fn startup(
    config: HubConfig,
    caller: Arc<dyn AgentCaller>,
    probe: Option<Arc<dyn HealthProbe>>,
) -> Result<StartupResult, LifecycleError> {
    let paths = config.paths.clone();
    match startup_inner(config, caller, probe).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Lock failures leave the running daemon's files alone.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                let _ = std::fs::remove_file(&paths.socket_path);
                let _ = std::fs::remove_file(&paths.pid_path);
            }
            Err(e)
        }
    }
}

async fn startup_inner(
    config: HubConfig,
    caller: Arc<dyn AgentCaller>,
    probe: Option<Arc<dyn HealthProbe>>,
) -> Result<StartupResult, LifecycleError> {
    let paths = &config.paths;

    // 1. Hub directory and tokens dir
    std::fs::create_dir_all(&paths.hub_dir)?;
    std::fs::create_dir_all(&paths.tokens_dir)?;

    // 2. Acquire the lock first, then write our PID into it
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&paths.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. PID file for the supervisor and CLI tooling
    std::fs::write(&paths.pid_path, format!("{}\n", std::process::id()))?;

    // 4. Seed config.json with defaults on first run
    seed_settings(&paths.config_path)?;

    // 5. Open stores
    let messages = MessageStore::new(open_db(&paths.db_path)?);
    messages.init()?;
    let tasks = TaskStore::new(open_db(&paths.db_path)?);
    tasks.init()?;
    let loaded = tasks.load()?;
    let trust = TrustStore::new(open_db(&paths.trust_db_path)?);
    trust.init()?;
    info!(tasks = loaded, "stores ready");

    // 6. Engines
    let settings = &config.settings;
    let bus = EventBus::new(settings.bus.ring_capacity, settings.bus.subscriber_queue);
    let clock = SystemClock;
    let health = Arc::new(HealthMonitor::new(clock.clone()));
    let sessions = SharedSessionManager::new(clock.clone());
    let sla = SlaCoordinator::new(settings.sla.clone());
    let council = CouncilEngine::new(Arc::clone(&caller), settings.council.clone())
        .with_cache(ResultCache::new(&paths.council_cache_path));
    let verifier = VerificationEngine::new(Arc::clone(&caller), settings.council.clone())
        .with_cache(ResultCache::new(&paths.verification_cache_path));
    let registry = ConnectionRegistry::new();
    let tokens = TokenStore::new(&paths.tokens_dir);

    let probe = probe.unwrap_or_else(|| {
        Arc::new(RegistryProbe { registry: registry.clone() }) as Arc<dyn HealthProbe>
    });
    let checker = Arc::new(HealthChecker::new(
        Arc::clone(&health),
        bus.clone(),
        probe,
        std::time::Duration::from_secs(settings.health.check_interval_secs),
        std::time::Duration::from_secs(settings.health.probe_timeout_secs),
    ));

    // 7. Remove a stale socket, then bind (last, after everything else holds)
    if paths.socket_path.exists() {
        std::fs::remove_file(&paths.socket_path)?;
    }
    let listener = UnixListener::bind(&paths.socket_path)
        .map_err(|e| LifecycleError::BindFailed(paths.socket_path.clone(), e))?;

    let state = Arc::new(HubState {
        config,
        bus,
        messages,
        tasks,
        trust,
        health,
        sessions,
        sla,
        council,
        verifier,
        registry,
        tokens,
        clock,
        shutdown: Arc::new(Notify::new()),
    });

    info!("daemon started");
    Ok(StartupResult { state, listener, checker, lock_file })
}

/// Tear down socket-facing state: remove the socket and PID files.
/// Store connections close when the state is dropped.
pub fn shutdown(state: &HubState) {
    let paths = &state.config.paths;
    if paths.socket_path.exists() {
        let _ = std::fs::remove_file(&paths.socket_path);
    }
    if paths.pid_path.exists() {
        let _ = std::fs::remove_file(&paths.pid_path);
    }
    info!("daemon stopped");
}
