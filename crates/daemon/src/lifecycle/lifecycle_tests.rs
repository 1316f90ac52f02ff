// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hub_core::{Clock, HandoffPayload, TaskStatus};
use hub_engine::FakeCaller;

fn test_config(dir: &std::path::Path) -> HubConfig {
    HubConfig::load(Some(dir.to_path_buf())).unwrap()
}

async fn start(dir: &std::path::Path) -> StartupResult {
    startup(test_config(dir), Arc::new(FakeCaller::new()), None).await.unwrap()
}

#[tokio::test]
async fn startup_lays_out_the_hub_dir() {
    let dir = tempfile::tempdir().unwrap();
    let result = start(dir.path()).await;

    let paths = &result.state.config.paths;
    assert!(paths.pid_path.exists());
    assert!(paths.config_path.exists());
    assert!(paths.tokens_dir.is_dir());
    assert!(paths.socket_path.exists());
    assert!(paths.db_path.exists());
    assert!(paths.trust_db_path.exists());

    let pid: u32 = std::fs::read_to_string(&paths.pid_path).unwrap().trim().parse().unwrap();
    assert_eq!(pid, std::process::id());
}

#[tokio::test]
async fn second_daemon_is_locked_out() {
    let dir = tempfile::tempdir().unwrap();
    let _first = start(dir.path()).await;

    let second =
        startup(test_config(dir.path()), Arc::new(FakeCaller::new()), None).await;
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
}

#[tokio::test]
async fn shutdown_removes_socket_and_pid() {
    let dir = tempfile::tempdir().unwrap();
    let result = start(dir.path()).await;
    let paths = result.state.config.paths.clone();

    shutdown(&result.state);
    assert!(!paths.socket_path.exists());
    assert!(!paths.pid_path.exists());
}

#[tokio::test]
async fn sla_round_quarantines_and_penalizes() {
    let dir = tempfile::tempdir().unwrap();
    let result = start(dir.path()).await;
    let state = &result.state;

    let payload = HandoffPayload {
        goal: "g".into(),
        acceptance_criteria: vec!["c".into()],
        run_commands: vec!["cargo test".into()],
        blocked_by: vec!["none".into()],
        criticality: None,
        reversibility: None,
        complexity: None,
        verifiability: None,
        delegation_depth: None,
        parent_handoff_id: None,
    };
    let now = state.clock.epoch_ms();
    // Two rejected handoffs put bob over the quarantine threshold.
    for i in 0..2 {
        let task = state
            .tasks
            .create_from_handoff(&format!("m{i}"), "bob", &payload, now)
            .unwrap();
        state.tasks.update_status(task.id.as_str(), TaskStatus::InProgress, None, now).unwrap();
        state
            .tasks
            .update_status(task.id.as_str(), TaskStatus::ReadyForReview, None, now)
            .unwrap();
        state
            .tasks
            .update_status(task.id.as_str(), TaskStatus::Rejected, Some("bad".into()), now)
            .unwrap();
    }

    let (_handle, mut rx) = state.bus.subscribe(vec!["SLA_ACTION".into()]);
    run_sla_round(state);

    let event = rx.drain().pop().expect("an SLA_ACTION event");
    assert_eq!(event.field("action").unwrap(), "quarantine_agent");
    assert_eq!(event.field("account").unwrap(), "bob");

    // Quarantine applied a trust penalty with a history row.
    let rep = state.trust.get("bob", now).unwrap();
    assert!(rep.trust_score < 50);
    let history = state.trust.history("bob", 10).unwrap();
    assert!(history.iter().any(|e| e.reason == "consecutive rejections"));
}
