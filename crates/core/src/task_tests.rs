// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::id::TaskId;

fn task() -> Task {
    Task::new(TaskId::new(), "wire the cache", 1_000)
}

#[test]
fn happy_path_records_events() {
    let mut t = task();
    t.transition(TaskStatus::InProgress, 2_000, None).unwrap();
    t.transition(TaskStatus::ReadyForReview, 3_000, None).unwrap();
    t.transition(TaskStatus::Accepted, 4_000, None).unwrap();

    assert_eq!(t.status, TaskStatus::Accepted);
    assert_eq!(t.started_at, Some(2_000));
    assert_eq!(t.events.len(), 3);
    assert_eq!(t.events[0].from, TaskStatus::Pending);
    assert_eq!(t.events[2].to, TaskStatus::Accepted);
}

#[test]
fn reject_requires_reason() {
    let mut t = task();
    t.transition(TaskStatus::InProgress, 0, None).unwrap();
    t.transition(TaskStatus::ReadyForReview, 0, None).unwrap();

    assert_eq!(
        t.transition(TaskStatus::Rejected, 0, None),
        Err(TransitionError::ReasonRequired)
    );
    assert_eq!(
        t.transition(TaskStatus::Rejected, 0, Some("  ".into())),
        Err(TransitionError::ReasonRequired)
    );
    t.transition(TaskStatus::Rejected, 0, Some("tests fail".into())).unwrap();
    assert_eq!(t.events.last().unwrap().reason.as_deref(), Some("tests fail"));
}

#[test]
fn terminal_states_refuse_transitions() {
    let mut t = task();
    t.transition(TaskStatus::InProgress, 0, None).unwrap();
    t.transition(TaskStatus::ReadyForReview, 0, None).unwrap();
    t.transition(TaskStatus::Accepted, 0, None).unwrap();

    assert_eq!(
        t.transition(TaskStatus::InProgress, 0, None),
        Err(TransitionError::Terminal(TaskStatus::Accepted))
    );
}

#[test]
fn reassign_increments_counter_and_clears_assignee() {
    let mut t = task();
    t.assignee = Some("bob".into());
    t.transition(TaskStatus::InProgress, 0, None).unwrap();
    t.transition(TaskStatus::Pending, 0, Some("stalled".into())).unwrap();

    assert_eq!(t.reassignment_count, 1);
    assert_eq!(t.assignee, None);
    assert_eq!(t.started_at, None);
    assert_eq!(t.status, TaskStatus::Pending);
}

#[test]
fn skipping_review_is_invalid() {
    let mut t = task();
    t.transition(TaskStatus::InProgress, 0, None).unwrap();
    assert_eq!(
        t.transition(TaskStatus::Accepted, 0, None),
        Err(TransitionError::Invalid { from: TaskStatus::InProgress, to: TaskStatus::Accepted })
    );
}

#[test]
fn status_round_trips_strings() {
    for status in [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::ReadyForReview,
        TaskStatus::Accepted,
        TaskStatus::Rejected,
    ] {
        assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(TaskStatus::parse("bogus"), None);
}
