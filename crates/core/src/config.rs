// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hub configuration.
//!
//! All filesystem locations derive from one hub directory resolved at
//! startup (`CLAUDE_HUB_DIR`, else `~/.claude-hub`). Components receive a
//! [`HubConfig`] and never read the environment themselves.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current config schema version.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot resolve home directory for hub dir")]
    NoHomeDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported config schemaVersion {0} (expected {SCHEMA_VERSION})")]
    SchemaVersion(u32),
}

/// Filesystem layout under the hub directory.
#[derive(Debug, Clone)]
pub struct HubPaths {
    pub hub_dir: PathBuf,
    pub socket_path: PathBuf,
    pub pid_path: PathBuf,
    pub lock_path: PathBuf,
    pub tokens_dir: PathBuf,
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    pub trust_db_path: PathBuf,
    pub council_cache_path: PathBuf,
    pub verification_cache_path: PathBuf,
    pub log_path: PathBuf,
}

impl HubPaths {
    pub fn under(hub_dir: impl Into<PathBuf>) -> Self {
        let hub_dir = hub_dir.into();
        Self {
            socket_path: hub_dir.join("hub.sock"),
            pid_path: hub_dir.join("daemon.pid"),
            lock_path: hub_dir.join("daemon.lock"),
            tokens_dir: hub_dir.join("tokens"),
            config_path: hub_dir.join("config.json"),
            db_path: hub_dir.join("hub.db"),
            trust_db_path: hub_dir.join("trust.db"),
            council_cache_path: hub_dir.join("council-cache.json"),
            verification_cache_path: hub_dir.join("council-verifications.json"),
            log_path: hub_dir.join("daemon.log"),
            hub_dir,
        }
    }
}

fn default_ring_capacity() -> usize {
    1000
}
fn default_subscriber_queue() -> usize {
    256
}

/// Event bus tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusSettings {
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,
    #[serde(default = "default_subscriber_queue")]
    pub subscriber_queue: usize,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self { ring_capacity: default_ring_capacity(), subscriber_queue: default_subscriber_queue() }
    }
}

fn default_check_interval_secs() -> u64 {
    300
}
fn default_probe_timeout_secs() -> u64 {
    10
}
fn default_stale_after_mins() -> u64 {
    10
}

/// Health checker tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSettings {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_stale_after_mins")]
    pub stale_after_mins: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            stale_after_mins: default_stale_after_mins(),
        }
    }
}

fn default_ping_after_mins() -> u64 {
    30
}
fn default_reassign_after_mins() -> u64 {
    60
}
fn default_max_reassignments() -> u32 {
    3
}
fn default_cooldown_mins() -> u64 {
    10
}
fn default_rejection_threshold() -> u32 {
    2
}
fn default_progress_stall_mins() -> u64 {
    10
}
fn default_progress_lag_percent() -> f64 {
    20.0
}

/// SLA ladder thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaSettings {
    #[serde(default = "default_ping_after_mins")]
    pub ping_after_mins: u64,
    #[serde(default = "default_reassign_after_mins")]
    pub reassign_after_mins: u64,
    #[serde(default = "default_max_reassignments")]
    pub max_reassignments: u32,
    #[serde(default = "default_cooldown_mins")]
    pub cooldown_mins: u64,
    #[serde(default = "default_rejection_threshold")]
    pub rejection_threshold: u32,
    #[serde(default = "default_progress_stall_mins")]
    pub progress_stall_mins: u64,
    #[serde(default = "default_progress_lag_percent")]
    pub progress_lag_percent: f64,
}

impl Default for SlaSettings {
    fn default() -> Self {
        Self {
            ping_after_mins: default_ping_after_mins(),
            reassign_after_mins: default_reassign_after_mins(),
            max_reassignments: default_max_reassignments(),
            cooldown_mins: default_cooldown_mins(),
            rejection_threshold: default_rejection_threshold(),
            progress_stall_mins: default_progress_stall_mins(),
            progress_lag_percent: default_progress_lag_percent(),
        }
    }
}

fn default_research_timeout_secs() -> u64 {
    180
}
fn default_discussion_timeout_secs() -> u64 {
    90
}
fn default_decision_timeout_secs() -> u64 {
    180
}
fn default_max_rounds() -> u32 {
    2
}

/// Council engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilSettings {
    #[serde(default = "default_research_timeout_secs")]
    pub research_timeout_secs: u64,
    #[serde(default = "default_discussion_timeout_secs")]
    pub discussion_timeout_secs: u64,
    #[serde(default = "default_decision_timeout_secs")]
    pub decision_timeout_secs: u64,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

impl Default for CouncilSettings {
    fn default() -> Self {
        Self {
            research_timeout_secs: default_research_timeout_secs(),
            discussion_timeout_secs: default_discussion_timeout_secs(),
            decision_timeout_secs: default_decision_timeout_secs(),
            max_rounds: default_max_rounds(),
        }
    }
}

fn default_archive_retention_days() -> u32 {
    14
}
fn default_idle_timeout_mins() -> u64 {
    30
}

/// Persisted daemon settings (`config.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubSettings {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub bus: BusSettings,
    #[serde(default)]
    pub health: HealthSettings,
    #[serde(default)]
    pub sla: SlaSettings,
    #[serde(default)]
    pub council: CouncilSettings,
    #[serde(default = "default_archive_retention_days")]
    pub archive_retention_days: u32,
    #[serde(default = "default_idle_timeout_mins")]
    pub idle_timeout_mins: u64,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            bus: BusSettings::default(),
            health: HealthSettings::default(),
            sla: SlaSettings::default(),
            council: CouncilSettings::default(),
            archive_retention_days: default_archive_retention_days(),
            idle_timeout_mins: default_idle_timeout_mins(),
        }
    }
}

/// Resolved runtime configuration: paths plus settings.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub paths: HubPaths,
    pub settings: HubSettings,
}

impl HubConfig {
    /// Resolve the hub directory and load (or seed) `config.json`.
    ///
    /// `hub_dir_override` carries the value of `CLAUDE_HUB_DIR` read once
    /// at process start; when `None`, falls back to `~/.claude-hub`.
    pub fn load(hub_dir_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        let hub_dir = match hub_dir_override {
            Some(dir) => dir,
            None => dirs::home_dir().ok_or(ConfigError::NoHomeDir)?.join(".claude-hub"),
        };
        let paths = HubPaths::under(hub_dir);
        let settings = load_settings(&paths.config_path)?;
        Ok(Self { paths, settings })
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.idle_timeout_mins * 60)
    }
}

fn load_settings(path: &Path) -> Result<HubSettings, ConfigError> {
    if !path.exists() {
        return Ok(HubSettings::default());
    }
    let raw = std::fs::read_to_string(path)?;
    let settings: HubSettings = serde_json::from_str(&raw)
        .map_err(|source| ConfigError::Invalid { path: path.to_path_buf(), source })?;
    if settings.schema_version != SCHEMA_VERSION {
        return Err(ConfigError::SchemaVersion(settings.schema_version));
    }
    Ok(settings)
}

/// Write the defaulted settings file if none exists yet.
pub fn seed_settings(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    let settings = HubSettings::default();
    let body = serde_json::to_string_pretty(&settings)
        .map_err(|source| ConfigError::Invalid { path: path.to_path_buf(), source })?;
    std::fs::write(path, body)?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
