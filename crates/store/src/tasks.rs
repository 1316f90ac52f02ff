// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task board: in-memory state with row-per-mutation persistence.
//!
//! The board is loaded once at startup; every mutation rewrites the task's
//! row inside a single transaction, so a crash never leaves a half-applied
//! transition. The store never emits bus events; callers do, with the
//! authenticated context in hand.

use std::collections::HashMap;

use hub_core::{task::ProgressReport, HandoffPayload, Task, TaskId, TaskStatus, TransitionError};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tracing::debug;

use crate::{Store, StoreError};

/// Task store backed by the shared hub database.
pub struct TaskStore {
    conn: Mutex<Connection>,
    board: Mutex<HashMap<TaskId, Task>>,
    /// Consecutive rejections per assignee; reset by an acceptance.
    rejections: Mutex<HashMap<String, u32>>,
}

impl TaskStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            board: Mutex::new(HashMap::new()),
            rejections: Mutex::new(HashMap::new()),
        }
    }

    /// Load the board from disk. Called once at startup, after `init`.
    pub fn load(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT data FROM tasks")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut board = self.board.lock();
        board.clear();
        for row in rows {
            let task: Task = serde_json::from_str(&row?)?;
            board.insert(task.id.clone(), task);
        }

        let mut stmt = conn.prepare("SELECT account, consecutive_rejections FROM task_counters")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
        })?;
        let mut rejections = self.rejections.lock();
        rejections.clear();
        for row in rows {
            let (account, count) = row?;
            rejections.insert(account, count);
        }

        debug!(tasks = board.len(), "task board loaded");
        Ok(board.len())
    }

    /// Create a task from an accepted handoff.
    pub fn create_from_handoff(
        &self,
        handoff_id: &str,
        assignee: &str,
        payload: &HandoffPayload,
        now: u64,
    ) -> Result<Task, StoreError> {
        let mut task = Task::new(TaskId::new(), payload.goal.clone(), now);
        task.assignee = Some(assignee.to_string());
        task.criticality = payload.criticality;
        task.handoff_id = Some(handoff_id.to_string());

        self.persist(&task)?;
        self.board.lock().insert(task.id.clone(), task.clone());
        Ok(task)
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.board.lock().get(id).cloned()
    }

    /// The task created from a given handoff message, if any.
    pub fn find_by_handoff(&self, handoff_id: &str) -> Option<Task> {
        self.board
            .lock()
            .values()
            .find(|task| task.handoff_id.as_deref() == Some(handoff_id))
            .cloned()
    }

    /// Apply a status transition and persist the result.
    ///
    /// Rejections bump the assignee's consecutive-rejection counter;
    /// acceptances reset it.
    pub fn update_status(
        &self,
        id: &str,
        to: TaskStatus,
        reason: Option<String>,
        now: u64,
    ) -> Result<Task, StoreError> {
        let (task, assignee) = {
            let mut board = self.board.lock();
            let task = board
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;
            let assignee = task.assignee.clone();
            task.transition(to, now, reason).map_err(transition_error)?;
            (task.clone(), assignee)
        };
        self.persist(&task)?;

        if let Some(account) = assignee {
            match to {
                TaskStatus::Rejected => self.bump_rejections(&account)?,
                TaskStatus::Accepted => self.reset_rejections(&account)?,
                _ => {}
            }
        }
        Ok(task)
    }

    /// Record a progress report for an in-progress task.
    pub fn record_progress(&self, id: &str, percent: f64, now: u64) -> Result<Task, StoreError> {
        let task = {
            let mut board = self.board.lock();
            let task = board
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;
            if task.status != TaskStatus::InProgress {
                return Err(StoreError::Invalid(format!(
                    "progress reports only apply to in_progress tasks (status: {})",
                    task.status.as_str()
                )));
            }
            task.last_progress_report =
                Some(ProgressReport { percent: percent.clamp(0.0, 100.0), timestamp: now });
            task.clone()
        };
        self.persist(&task)?;
        Ok(task)
    }

    /// Assign (or re-assign) a pending task.
    pub fn assign(&self, id: &str, account: &str) -> Result<Task, StoreError> {
        let task = {
            let mut board = self.board.lock();
            let task = board
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;
            task.assignee = Some(account.to_string());
            task.clone()
        };
        self.persist(&task)?;
        Ok(task)
    }

    /// Snapshot of in-progress tasks for the SLA evaluator.
    pub fn in_progress(&self) -> Vec<Task> {
        self.board
            .lock()
            .values()
            .filter(|task| task.status == TaskStatus::InProgress)
            .cloned()
            .collect()
    }

    /// All tasks on the board.
    pub fn all(&self) -> Vec<Task> {
        self.board.lock().values().cloned().collect()
    }

    /// Consecutive-rejection counters by assignee.
    pub fn consecutive_rejections(&self) -> HashMap<String, u32> {
        self.rejections.lock().clone()
    }

    fn bump_rejections(&self, account: &str) -> Result<(), StoreError> {
        let count = {
            let mut rejections = self.rejections.lock();
            let count = rejections.entry(account.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO task_counters (account, consecutive_rejections) VALUES (?1, ?2)
             ON CONFLICT(account) DO UPDATE SET consecutive_rejections = ?2",
            params![account, count],
        )?;
        Ok(())
    }

    fn reset_rejections(&self, account: &str) -> Result<(), StoreError> {
        self.rejections.lock().remove(account);
        let conn = self.conn.lock();
        conn.execute("DELETE FROM task_counters WHERE account = ?1", params![account])?;
        Ok(())
    }

    fn persist(&self, task: &Task) -> Result<(), StoreError> {
        let data = serde_json::to_string(task)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO tasks (id, status, assignee, data) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET status = ?2, assignee = ?3, data = ?4",
            params![task.id.as_str(), task.status.as_str(), task.assignee, data],
        )?;
        Ok(())
    }
}

impl Store for TaskStore {
    fn init(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                assignee TEXT,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks (status);
            CREATE TABLE IF NOT EXISTS task_counters (
                account TEXT PRIMARY KEY,
                consecutive_rejections INTEGER NOT NULL DEFAULT 0
            );",
        )?;
        Ok(())
    }

    fn close(self) -> Result<(), StoreError> {
        let conn = self.conn.into_inner();
        conn.close().map_err(|(_, e)| StoreError::Db(e))
    }
}

fn transition_error(err: TransitionError) -> StoreError {
    StoreError::Invalid(err.to_string())
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
