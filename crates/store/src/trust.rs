// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reputation store: outcome counters, trust scores, score history.

use hub_core::{AgentReputation, Outcome, TrustLevel};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{Store, StoreError};

/// One row of the score history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustEvent {
    pub id: i64,
    pub account: String,
    pub timestamp: u64,
    pub delta: i64,
    pub reason: String,
    pub old_score: i64,
    pub new_score: i64,
}

/// Reputation store backed by the trust database.
pub struct TrustStore {
    conn: Mutex<Connection>,
}

impl TrustStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    /// The reputation record for an account; cold-start defaults when the
    /// account has never been scored.
    pub fn get(&self, account: &str, now: u64) -> Result<AgentReputation, StoreError> {
        let conn = self.conn.lock();
        let found = conn
            .query_row(
                "SELECT account, completed, failed, rejected, critical_failures,
                        avg_completion_minutes, completion_rate, sla_compliance_rate,
                        quality_variance, progress_reporting_rate, trust_score, last_updated
                 FROM reputation WHERE account = ?1",
                params![account],
                row_to_reputation,
            )
            .optional()?;
        Ok(found.unwrap_or_else(|| AgentReputation::cold_start(account, now)))
    }

    /// Record a task outcome and recompute the derived score.
    pub fn record_outcome(
        &self,
        account: &str,
        outcome: Outcome,
        duration_min: Option<f64>,
        was_critical: bool,
        now: u64,
    ) -> Result<AgentReputation, StoreError> {
        let mut rep = self.get(account, now)?;
        let old_score = rep.trust_score;

        match outcome {
            Outcome::Completed => {
                rep.completed += 1;
                if let Some(minutes) = duration_min {
                    let n = f64::from(rep.completed);
                    // Running average over completions only
                    rep.average_completion_minutes =
                        rep.average_completion_minutes + (minutes - rep.average_completion_minutes) / n;
                }
            }
            Outcome::Failed => {
                rep.failed += 1;
                if was_critical {
                    rep.critical_failure_count += 1;
                }
            }
            Outcome::Rejected => rep.rejected += 1,
        }
        let total = f64::from(rep.total_outcomes());
        rep.completion_rate = f64::from(rep.completed) / total;
        rep.last_updated = now;
        rep.recompute_score();

        self.upsert(&rep)?;
        let delta = rep.trust_score - old_score;
        if delta != 0 {
            self.append_history(account, now, delta, outcome.as_str(), old_score, rep.trust_score)?;
        }
        Ok(rep)
    }

    /// Adjust an account's score directly (penalties and bonuses).
    pub fn apply_delta(
        &self,
        account: &str,
        delta: i64,
        reason: &str,
        now: u64,
    ) -> Result<AgentReputation, StoreError> {
        let mut rep = self.get(account, now)?;
        let old_score = rep.trust_score;
        rep.trust_score = (rep.trust_score + delta).clamp(0, 100);
        rep.trust_level = TrustLevel::from_score(rep.trust_score);
        rep.last_updated = now;

        self.upsert(&rep)?;
        let applied = rep.trust_score - old_score;
        if applied != 0 {
            self.append_history(account, now, applied, reason, old_score, rep.trust_score)?;
        }
        Ok(rep)
    }

    /// Update the rolling compliance/reporting rates (SLA loop feedback).
    pub fn update_rates(
        &self,
        account: &str,
        sla_compliance_rate: Option<f64>,
        progress_reporting_rate: Option<f64>,
        quality_variance: Option<f64>,
        now: u64,
    ) -> Result<AgentReputation, StoreError> {
        let mut rep = self.get(account, now)?;
        let old_score = rep.trust_score;
        if let Some(rate) = sla_compliance_rate {
            rep.sla_compliance_rate = rate.clamp(0.0, 1.0);
        }
        if let Some(rate) = progress_reporting_rate {
            rep.progress_reporting_rate = rate.clamp(0.0, 1.0);
        }
        if let Some(variance) = quality_variance {
            rep.quality_variance = variance.max(0.0);
        }
        rep.last_updated = now;
        rep.recompute_score();

        self.upsert(&rep)?;
        let delta = rep.trust_score - old_score;
        if delta != 0 {
            self.append_history(account, now, delta, "rate update", old_score, rep.trust_score)?;
        }
        Ok(rep)
    }

    /// Score history for an account, newest first.
    pub fn history(&self, account: &str, limit: u32) -> Result<Vec<TrustEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, account, timestamp, delta, reason, old_score, new_score
             FROM trust_history WHERE account = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![account, limit], |row| {
            Ok(TrustEvent {
                id: row.get(0)?,
                account: row.get(1)?,
                timestamp: row.get(2)?,
                delta: row.get(3)?,
                reason: row.get(4)?,
                old_score: row.get(5)?,
                new_score: row.get(6)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    fn upsert(&self, rep: &AgentReputation) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO reputation (account, completed, failed, rejected, critical_failures,
                                     avg_completion_minutes, completion_rate, sla_compliance_rate,
                                     quality_variance, progress_reporting_rate, trust_score, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(account) DO UPDATE SET
                completed = ?2, failed = ?3, rejected = ?4, critical_failures = ?5,
                avg_completion_minutes = ?6, completion_rate = ?7, sla_compliance_rate = ?8,
                quality_variance = ?9, progress_reporting_rate = ?10, trust_score = ?11,
                last_updated = ?12",
            params![
                rep.account,
                rep.completed,
                rep.failed,
                rep.rejected,
                rep.critical_failure_count,
                rep.average_completion_minutes,
                rep.completion_rate,
                rep.sla_compliance_rate,
                rep.quality_variance,
                rep.progress_reporting_rate,
                rep.trust_score,
                rep.last_updated,
            ],
        )?;
        Ok(())
    }

    fn append_history(
        &self,
        account: &str,
        now: u64,
        delta: i64,
        reason: &str,
        old_score: i64,
        new_score: i64,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO trust_history (account, timestamp, delta, reason, old_score, new_score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![account, now, delta, reason, old_score, new_score],
        )?;
        Ok(())
    }
}

impl Store for TrustStore {
    fn init(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reputation (
                account TEXT PRIMARY KEY,
                completed INTEGER NOT NULL DEFAULT 0,
                failed INTEGER NOT NULL DEFAULT 0,
                rejected INTEGER NOT NULL DEFAULT 0,
                critical_failures INTEGER NOT NULL DEFAULT 0,
                avg_completion_minutes REAL NOT NULL DEFAULT 0,
                completion_rate REAL NOT NULL DEFAULT 1,
                sla_compliance_rate REAL NOT NULL DEFAULT 1,
                quality_variance REAL NOT NULL DEFAULT 0,
                progress_reporting_rate REAL NOT NULL DEFAULT 1,
                trust_score INTEGER NOT NULL DEFAULT 50,
                last_updated INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS trust_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                delta INTEGER NOT NULL,
                reason TEXT NOT NULL,
                old_score INTEGER NOT NULL,
                new_score INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trust_history_account
                ON trust_history (account, id);",
        )?;
        Ok(())
    }

    fn close(self) -> Result<(), StoreError> {
        let conn = self.conn.into_inner();
        conn.close().map_err(|(_, e)| StoreError::Db(e))
    }
}

fn row_to_reputation(row: &Row<'_>) -> rusqlite::Result<AgentReputation> {
    let score: i64 = row.get(10)?;
    Ok(AgentReputation {
        account: row.get(0)?,
        completed: row.get(1)?,
        failed: row.get(2)?,
        rejected: row.get(3)?,
        critical_failure_count: row.get(4)?,
        average_completion_minutes: row.get(5)?,
        completion_rate: row.get(6)?,
        sla_compliance_rate: row.get(7)?,
        quality_variance: row.get(8)?,
        progress_reporting_rate: row.get(9)?,
        trust_score: score,
        trust_level: TrustLevel::from_score(score),
        last_updated: row.get(11)?,
    })
}

#[cfg(test)]
#[path = "trust_tests.rs"]
mod tests;
