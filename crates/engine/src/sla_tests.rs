// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const MIN: u64 = 60 * 1000;

fn coordinator() -> SlaCoordinator {
    SlaCoordinator::new(SlaSettings::default())
}

fn in_progress(task_id: &str, started_mins_ago: u64, now: u64) -> TaskSla {
    TaskSla {
        task_id: task_id.to_string(),
        status: TaskStatus::InProgress,
        assignee: Some("bob".to_string()),
        started_at: Some(now - started_mins_ago * MIN),
        criticality: None,
        reassignment_count: 0,
        last_progress_report: None,
        estimated_duration_mins: 60,
    }
}

#[test]
fn thirty_five_minutes_gets_exactly_one_ping() {
    let now = 1_000 * MIN;
    let actions = coordinator().evaluate(&[in_progress("t1", 35, now)], &HashMap::new(), now);
    assert_eq!(actions, vec![ResponseAction::Ping { task_id: "t1".to_string() }]);
}

#[test]
fn young_task_gets_nothing() {
    let now = 1_000 * MIN;
    let actions = coordinator().evaluate(&[in_progress("t1", 10, now)], &HashMap::new(), now);
    assert!(actions.is_empty());
}

#[test]
fn non_in_progress_tasks_are_ignored() {
    let now = 1_000 * MIN;
    let mut task = in_progress("t1", 120, now);
    task.status = TaskStatus::ReadyForReview;
    let actions = coordinator().evaluate(&[task], &HashMap::new(), now);
    assert!(actions.is_empty());
}

#[test]
fn over_an_hour_suggests_reassign() {
    let now = 1_000 * MIN;
    let actions = coordinator().evaluate(&[in_progress("t1", 61, now)], &HashMap::new(), now);
    assert_eq!(actions, vec![ResponseAction::SuggestReassign { task_id: "t1".to_string() }]);
}

#[test]
fn critical_task_auto_reassigns_with_cooldown() {
    let now = 1_000 * MIN;
    let coordinator = coordinator();
    let mut task = in_progress("t1", 61, now);
    task.criticality = Some(Criticality::Critical);

    let actions = coordinator.evaluate(&[task.clone()], &HashMap::new(), now);
    assert_eq!(actions, vec![ResponseAction::AutoReassign { task_id: "t1".to_string() }]);

    // Within the cooldown the ladder falls through to suggest_reassign.
    let actions = coordinator.evaluate(&[task.clone()], &HashMap::new(), now + 5 * MIN);
    assert_eq!(actions, vec![ResponseAction::SuggestReassign { task_id: "t1".to_string() }]);

    // After the cooldown it may reassign again.
    let actions = coordinator.evaluate(&[task], &HashMap::new(), now + 11 * MIN);
    assert_eq!(actions, vec![ResponseAction::AutoReassign { task_id: "t1".to_string() }]);
}

#[test]
fn exhausted_reassignments_escalate_to_human() {
    let now = 1_000 * MIN;
    let mut task = in_progress("t1", 61, now);
    task.reassignment_count = 3;
    task.criticality = Some(Criticality::Critical);
    let actions = coordinator().evaluate(&[task], &HashMap::new(), now);
    assert_eq!(actions, vec![ResponseAction::EscalateHuman { task_id: "t1".to_string() }]);
}

#[test]
fn consecutive_rejections_quarantine_without_tasks() {
    let now = 1_000 * MIN;
    let rejections = HashMap::from([("bob".to_string(), 2u32), ("ok".to_string(), 1u32)]);
    let actions = coordinator().evaluate(&[], &rejections, now);
    assert_eq!(
        actions,
        vec![ResponseAction::QuarantineAgent {
            account: "bob".to_string(),
            reason: "consecutive rejections".to_string(),
        }]
    );
}

#[test]
fn stalled_progress_report_quarantines_unresponsive() {
    let now = 1_000 * MIN;
    let mut task = in_progress("t1", 20, now);
    task.last_progress_report =
        Some(ProgressReport { percent: 40.0, timestamp: now - 11 * MIN });
    let actions = coordinator().evaluate(&[task], &HashMap::new(), now);
    assert!(actions.contains(&ResponseAction::QuarantineAgent {
        account: "bob".to_string(),
        reason: "unresponsive".to_string(),
    }));
}

#[test]
fn lagging_progress_warns() {
    let now = 1_000 * MIN;
    let mut task = in_progress("t1", 45, now); // expected 75% of a 60-min task
    task.last_progress_report = Some(ProgressReport { percent: 30.0, timestamp: now - MIN });
    let actions = coordinator().evaluate(&[task], &HashMap::new(), now);
    assert!(actions.contains(&ResponseAction::ProactiveWarning { task_id: "t1".to_string() }));
}

#[test]
fn on_pace_progress_does_not_warn() {
    let now = 1_000 * MIN;
    let mut task = in_progress("t1", 45, now);
    task.last_progress_report = Some(ProgressReport { percent: 70.0, timestamp: now - MIN });
    let actions = coordinator().evaluate(&[task], &HashMap::new(), now);
    assert!(actions
        .iter()
        .all(|a| !matches!(a, ResponseAction::ProactiveWarning { .. })));
}

#[test]
fn independent_checks_stack_with_ladder() {
    let now = 1_000 * MIN;
    let mut task = in_progress("t1", 61, now);
    task.last_progress_report =
        Some(ProgressReport { percent: 1.0, timestamp: now - 12 * MIN });
    let actions = coordinator().evaluate(&[task], &HashMap::new(), now);
    // quarantine (stalled) + warning (lagging) + suggest_reassign (ladder)
    assert_eq!(actions.len(), 3);
}
