// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task records and their status lifecycle.
//!
//! ```text
//! pending ──start──▶ in_progress ──submit──▶ ready_for_review
//!                                     │
//!                                     ├─accept──▶ accepted (terminal)
//!                                     └─reject──▶ rejected (terminal, reason required)
//! in_progress ──reassign──▶ pending  (reassignment_count += 1)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handoff::Criticality;
use crate::id::TaskId;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    ReadyForReview,
    Accepted,
    Rejected,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::ReadyForReview => "ready_for_review",
            TaskStatus::Accepted => "accepted",
            TaskStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "ready_for_review" => Some(TaskStatus::ReadyForReview),
            "accepted" => Some(TaskStatus::Accepted),
            "rejected" => Some(TaskStatus::Rejected),
            _ => None,
        }
    }

    /// Accepted and rejected tasks never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Accepted | TaskStatus::Rejected)
    }
}

/// A recorded status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: u64,
    pub from: TaskStatus,
    pub to: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Latest self-reported progress for an in-progress task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub percent: f64,
    pub timestamp: u64,
}

/// A tracked unit of handed-off work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criticality: Option<Criticality>,
    #[serde(default)]
    pub reassignment_count: u32,
    #[serde(default)]
    pub events: Vec<TaskEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_progress_report: Option<ProgressReport>,
    /// Message id of the handoff this task was created from, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_id: Option<String>,
}

/// Rejected status transitions.
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("invalid transition: {from} -> {to}")]
    Invalid { from: TaskStatus, to: TaskStatus },

    #[error("task is terminal in status {0}")]
    Terminal(TaskStatus),

    #[error("rejection requires a non-empty reason")]
    ReasonRequired,
}

impl Task {
    pub fn new(id: TaskId, title: impl Into<String>, created_at: u64) -> Self {
        Self {
            id,
            title: title.into(),
            status: TaskStatus::Pending,
            assignee: None,
            created_at,
            started_at: None,
            criticality: None,
            reassignment_count: 0,
            events: Vec::new(),
            last_progress_report: None,
            handoff_id: None,
        }
    }

    /// Apply a status transition, recording it as an event.
    ///
    /// `reason` is required for rejections and carried on the event for
    /// every other transition when present.
    pub fn transition(
        &mut self,
        to: TaskStatus,
        now: u64,
        reason: Option<String>,
    ) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal(self.status));
        }
        let from = self.status;
        let allowed = matches!(
            (from, to),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::ReadyForReview)
                | (TaskStatus::InProgress, TaskStatus::Pending)
                | (TaskStatus::ReadyForReview, TaskStatus::Accepted)
                | (TaskStatus::ReadyForReview, TaskStatus::Rejected)
        );
        if !allowed {
            return Err(TransitionError::Invalid { from, to });
        }
        if to == TaskStatus::Rejected && reason.as_deref().map_or(true, |r| r.trim().is_empty()) {
            return Err(TransitionError::ReasonRequired);
        }

        match (from, to) {
            (TaskStatus::Pending, TaskStatus::InProgress) => self.started_at = Some(now),
            (TaskStatus::InProgress, TaskStatus::Pending) => {
                self.reassignment_count += 1;
                self.started_at = None;
                self.assignee = None;
            }
            _ => {}
        }

        self.status = to;
        self.events.push(TaskEvent {
            kind: "status_change".to_string(),
            timestamp: now,
            from,
            to,
            reason,
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
