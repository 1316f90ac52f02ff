// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reputation counters and the trust score derivation.

use serde::{Deserialize, Serialize};

/// Trust score for an account with no recorded outcomes.
pub const COLD_START_SCORE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Low,
    Medium,
    High,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Low => "low",
            TrustLevel::Medium => "medium",
            TrustLevel::High => "high",
        }
    }

    /// Level thresholds: >=70 high, >=40 medium, else low.
    pub fn from_score(score: i64) -> Self {
        if score >= 70 {
            TrustLevel::High
        } else if score >= 40 {
            TrustLevel::Medium
        } else {
            TrustLevel::Low
        }
    }
}

impl Default for TrustLevel {
    fn default() -> Self {
        TrustLevel::Medium
    }
}

/// Outcome of a completed piece of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Failed,
    Rejected,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Failed => "failed",
            Outcome::Rejected => "rejected",
        }
    }
}

/// Reputation counters for one account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentReputation {
    pub account: String,
    pub completed: u32,
    pub failed: u32,
    pub rejected: u32,
    pub critical_failure_count: u32,
    pub average_completion_minutes: f64,
    pub completion_rate: f64,
    pub sla_compliance_rate: f64,
    pub quality_variance: f64,
    pub progress_reporting_rate: f64,
    pub trust_score: i64,
    pub trust_level: TrustLevel,
    pub last_updated: u64,
}

impl AgentReputation {
    /// Cold-start record: score 50, level medium.
    pub fn cold_start(account: impl Into<String>, now: u64) -> Self {
        Self {
            account: account.into(),
            completed: 0,
            failed: 0,
            rejected: 0,
            critical_failure_count: 0,
            average_completion_minutes: 0.0,
            completion_rate: 1.0,
            sla_compliance_rate: 1.0,
            quality_variance: 0.0,
            progress_reporting_rate: 1.0,
            trust_score: COLD_START_SCORE,
            trust_level: TrustLevel::Medium,
            last_updated: now,
        }
    }

    pub fn total_outcomes(&self) -> u32 {
        self.completed + self.failed + self.rejected
    }

    /// Recompute the derived score and level from the counters.
    pub fn recompute_score(&mut self) {
        if self.total_outcomes() == 0 {
            self.trust_score = COLD_START_SCORE;
            self.trust_level = TrustLevel::Medium;
            return;
        }
        self.trust_score = compute_score(self);
        self.trust_level = TrustLevel::from_score(self.trust_score);
    }
}

/// The trust score formula.
///
/// completion 35 + SLA 25 + quality 20 + behavioral 10 + volume bonus 10,
/// clamped to [0, 100] and rounded.
pub fn compute_score(rep: &AgentReputation) -> i64 {
    let completion_score = rep.completion_rate * 35.0;
    let sla_score = rep.sla_compliance_rate * 25.0;
    let quality_score = (20.0
        - f64::from(rep.critical_failure_count) * 5.0
        - rep.quality_variance * 10.0)
        .max(0.0);
    let behavioral_score = rep.progress_reporting_rate * 10.0;
    let volume_bonus = (f64::from(rep.total_outcomes()) * 0.5).min(10.0);

    let raw = completion_score + sla_score + quality_score + behavioral_score + volume_bonus;
    (raw.clamp(0.0, 100.0)).round() as i64
}

#[cfg(test)]
#[path = "reputation_tests.rs"]
mod tests;
