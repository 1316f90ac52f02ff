// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::open_memory_db;

fn store() -> TaskStore {
    let store = TaskStore::new(open_memory_db().unwrap());
    store.init().unwrap();
    store
}

fn payload(goal: &str) -> HandoffPayload {
    HandoffPayload {
        goal: goal.to_string(),
        acceptance_criteria: vec!["done".to_string()],
        run_commands: vec!["cargo test".to_string()],
        blocked_by: vec!["none".to_string()],
        criticality: None,
        reversibility: None,
        complexity: None,
        verifiability: None,
        delegation_depth: None,
        parent_handoff_id: None,
    }
}

#[test]
fn create_from_handoff_seeds_pending_task() {
    let store = store();
    let task = store.create_from_handoff("msg-h1", "bob", &payload("ship it"), 100).unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.assignee.as_deref(), Some("bob"));
    assert_eq!(task.title, "ship it");
    assert_eq!(store.find_by_handoff("msg-h1").unwrap().id, task.id);
}

#[test]
fn update_status_walks_lifecycle() {
    let store = store();
    let task = store.create_from_handoff("msg-h1", "bob", &payload("g"), 0).unwrap();
    let id = task.id.as_str().to_string();

    store.update_status(&id, TaskStatus::InProgress, None, 1).unwrap();
    store.update_status(&id, TaskStatus::ReadyForReview, None, 2).unwrap();
    let accepted = store.update_status(&id, TaskStatus::Accepted, None, 3).unwrap();

    assert_eq!(accepted.status, TaskStatus::Accepted);
    assert_eq!(accepted.events.len(), 3);
}

#[test]
fn reject_without_reason_fails() {
    let store = store();
    let task = store.create_from_handoff("msg-h1", "bob", &payload("g"), 0).unwrap();
    let id = task.id.as_str().to_string();
    store.update_status(&id, TaskStatus::InProgress, None, 1).unwrap();
    store.update_status(&id, TaskStatus::ReadyForReview, None, 2).unwrap();

    assert!(matches!(
        store.update_status(&id, TaskStatus::Rejected, None, 3),
        Err(StoreError::Invalid(_))
    ));
}

#[test]
fn rejections_accumulate_and_acceptance_resets() {
    let store = store();
    for i in 0..2 {
        let task = store
            .create_from_handoff(&format!("msg-h{i}"), "bob", &payload("g"), 0)
            .unwrap();
        let id = task.id.as_str().to_string();
        store.update_status(&id, TaskStatus::InProgress, None, 1).unwrap();
        store.update_status(&id, TaskStatus::ReadyForReview, None, 2).unwrap();
        store.update_status(&id, TaskStatus::Rejected, Some("no".into()), 3).unwrap();
    }
    assert_eq!(store.consecutive_rejections().get("bob"), Some(&2));

    let task = store.create_from_handoff("msg-ok", "bob", &payload("g"), 0).unwrap();
    let id = task.id.as_str().to_string();
    store.update_status(&id, TaskStatus::InProgress, None, 1).unwrap();
    store.update_status(&id, TaskStatus::ReadyForReview, None, 2).unwrap();
    store.update_status(&id, TaskStatus::Accepted, None, 3).unwrap();
    assert_eq!(store.consecutive_rejections().get("bob"), None);
}

#[test]
fn board_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hub.db");

    let store = TaskStore::new(crate::open_db(&path).unwrap());
    store.init().unwrap();
    let task = store.create_from_handoff("msg-h1", "bob", &payload("persisted"), 7).unwrap();
    store.update_status(task.id.as_str(), TaskStatus::InProgress, None, 8).unwrap();
    store.close().unwrap();

    let store = TaskStore::new(crate::open_db(&path).unwrap());
    store.init().unwrap();
    assert_eq!(store.load().unwrap(), 1);
    let loaded = store.get(task.id.as_str()).unwrap();
    assert_eq!(loaded.status, TaskStatus::InProgress);
    assert_eq!(loaded.title, "persisted");
    assert_eq!(loaded.events.len(), 1);
}

#[test]
fn progress_reports_require_in_progress() {
    let store = store();
    let task = store.create_from_handoff("msg-h1", "bob", &payload("g"), 0).unwrap();
    let id = task.id.as_str().to_string();

    assert!(matches!(
        store.record_progress(&id, 10.0, 1),
        Err(StoreError::Invalid(_))
    ));

    store.update_status(&id, TaskStatus::InProgress, None, 1).unwrap();
    let task = store.record_progress(&id, 140.0, 2).unwrap();
    let report = task.last_progress_report.unwrap();
    assert_eq!(report.percent, 100.0); // clamped
    assert_eq!(report.timestamp, 2);
}

#[test]
fn in_progress_snapshot_filters() {
    let store = store();
    let a = store.create_from_handoff("m1", "bob", &payload("a"), 0).unwrap();
    store.create_from_handoff("m2", "bob", &payload("b"), 0).unwrap();
    store.update_status(a.id.as_str(), TaskStatus::InProgress, None, 1).unwrap();

    let snapshot = store.in_progress();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, a.id);
}
