// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adaptive SLA coordinator.
//!
//! A periodic evaluator that turns the current task board into response
//! actions. Stateless apart from per-task reassignment cooldowns. The
//! escalation ladder is first-match; quarantine and proactive-warning
//! checks run independently of it.

use std::collections::HashMap;

use hub_core::config::SlaSettings;
use hub_core::{task::ProgressReport, Criticality, Task, TaskStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

const MS_PER_MIN: u64 = 60 * 1000;

/// Fallback estimate when a task has no duration estimate attached.
pub const DEFAULT_ESTIMATED_DURATION_MINS: u64 = 60;

/// What the coordinator asks the daemon to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResponseAction {
    #[serde(rename_all = "camelCase")]
    Ping { task_id: String },
    #[serde(rename_all = "camelCase")]
    SuggestReassign { task_id: String },
    #[serde(rename_all = "camelCase")]
    AutoReassign { task_id: String },
    #[serde(rename_all = "camelCase")]
    QuarantineAgent { account: String, reason: String },
    #[serde(rename_all = "camelCase")]
    EscalateHuman { task_id: String },
    #[serde(rename_all = "camelCase")]
    ProactiveWarning { task_id: String },
}

/// The slice of a task the evaluator looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSla {
    pub task_id: String,
    pub status: TaskStatus,
    pub assignee: Option<String>,
    pub started_at: Option<u64>,
    pub criticality: Option<Criticality>,
    pub reassignment_count: u32,
    pub last_progress_report: Option<ProgressReport>,
    pub estimated_duration_mins: u64,
}

impl TaskSla {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id.as_str().to_string(),
            status: task.status,
            assignee: task.assignee.clone(),
            started_at: task.started_at,
            criticality: task.criticality,
            reassignment_count: task.reassignment_count,
            last_progress_report: task.last_progress_report,
            estimated_duration_mins: DEFAULT_ESTIMATED_DURATION_MINS,
        }
    }

    pub fn with_estimate(mut self, mins: u64) -> Self {
        self.estimated_duration_mins = mins.max(1);
        self
    }
}

/// Periodic evaluator over the task board.
pub struct SlaCoordinator {
    settings: SlaSettings,
    /// Per-task epoch-ms of the last auto-reassignment, for the cooldown.
    last_reassigned: Mutex<HashMap<String, u64>>,
}

impl SlaCoordinator {
    pub fn new(settings: SlaSettings) -> Self {
        Self { settings, last_reassigned: Mutex::new(HashMap::new()) }
    }

    /// Evaluate a board snapshot. `rejections` carries consecutive
    /// rejection counts per account.
    pub fn evaluate(
        &self,
        tasks: &[TaskSla],
        rejections: &HashMap<String, u32>,
        now: u64,
    ) -> Vec<ResponseAction> {
        let mut actions = Vec::new();

        // Independent check: rejection quarantine, once per account, even
        // when the account has nothing in progress.
        let mut quarantined: Vec<&String> = rejections
            .iter()
            .filter(|(_, &count)| count >= self.settings.rejection_threshold)
            .map(|(account, _)| account)
            .collect();
        quarantined.sort();
        for account in quarantined {
            actions.push(ResponseAction::QuarantineAgent {
                account: account.clone(),
                reason: "consecutive rejections".to_string(),
            });
        }

        for task in tasks {
            if task.status != TaskStatus::InProgress {
                continue;
            }
            let Some(started_at) = task.started_at else {
                continue;
            };
            let elapsed_ms = now.saturating_sub(started_at);

            // Independent checks against the latest progress report. A task
            // that has never reported is handled by the ladder alone.
            if let Some(report) = task.last_progress_report {
                if now.saturating_sub(report.timestamp)
                    > self.settings.progress_stall_mins * MS_PER_MIN
                {
                    if let Some(account) = &task.assignee {
                        actions.push(ResponseAction::QuarantineAgent {
                            account: account.clone(),
                            reason: "unresponsive".to_string(),
                        });
                    }
                }

                let expected = (elapsed_ms as f64
                    / (task.estimated_duration_mins * MS_PER_MIN) as f64)
                    * 100.0;
                if report.percent < expected - self.settings.progress_lag_percent {
                    actions
                        .push(ResponseAction::ProactiveWarning { task_id: task.task_id.clone() });
                }
            }

            if let Some(action) = self.ladder_action(task, elapsed_ms, now) {
                actions.push(action);
            }
        }

        actions
    }

    /// The escalation ladder proper: first match wins.
    fn ladder_action(&self, task: &TaskSla, elapsed_ms: u64, now: u64) -> Option<ResponseAction> {
        let reassign_after = self.settings.reassign_after_mins * MS_PER_MIN;
        let ping_after = self.settings.ping_after_mins * MS_PER_MIN;

        if task.reassignment_count >= self.settings.max_reassignments
            && elapsed_ms > reassign_after
        {
            return Some(ResponseAction::EscalateHuman { task_id: task.task_id.clone() });
        }
        if elapsed_ms > reassign_after
            && task.criticality == Some(Criticality::Critical)
            && self.cooldown_elapsed(&task.task_id, now)
        {
            self.last_reassigned.lock().insert(task.task_id.clone(), now);
            return Some(ResponseAction::AutoReassign { task_id: task.task_id.clone() });
        }
        if elapsed_ms > reassign_after {
            return Some(ResponseAction::SuggestReassign { task_id: task.task_id.clone() });
        }
        if elapsed_ms > ping_after {
            return Some(ResponseAction::Ping { task_id: task.task_id.clone() });
        }
        None
    }

    fn cooldown_elapsed(&self, task_id: &str, now: u64) -> bool {
        let last = self.last_reassigned.lock().get(task_id).copied();
        match last {
            Some(at) => now.saturating_sub(at) >= self.settings.cooldown_mins * MS_PER_MIN,
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "sla_tests.rs"]
mod tests;
