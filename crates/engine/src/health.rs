// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health monitor: the pure state side of account health.
//!
//! Holds one [`AccountHealth`] record per account and recomputes the
//! derived status on every update. The active probing loop lives in
//! [`crate::checker`].

use std::collections::HashMap;

use hub_core::{AccountHealth, Clock, HealthAggregate, HealthUpdate};
use parking_lot::Mutex;

/// Thread-safe map of account health records.
pub struct HealthMonitor<C: Clock> {
    records: Mutex<HashMap<String, AccountHealth>>,
    clock: C,
}

impl<C: Clock> HealthMonitor<C> {
    pub fn new(clock: C) -> Self {
        Self { records: Mutex::new(HashMap::new()), clock }
    }

    /// Merge a partial update into the account's record, seeding from
    /// defaults on first sight, and recompute the derived status.
    pub fn update(&self, account: &str, update: HealthUpdate) -> AccountHealth {
        let now = self.clock.epoch_ms();
        let mut records = self.records.lock();
        let record = records
            .entry(account.to_string())
            .or_insert_with(|| AccountHealth::seed(account, now));
        record.apply(&update, now);
        record.clone()
    }

    /// Record activity: bumps `last_activity` to now.
    pub fn touch(&self, account: &str) -> AccountHealth {
        let now = self.clock.epoch_ms();
        self.update(account, HealthUpdate { last_activity: Some(now), ..Default::default() })
    }

    /// Bump the error counter by one.
    pub fn record_error(&self, account: &str) -> AccountHealth {
        let current = self.get(account).map(|h| h.error_count).unwrap_or(0);
        self.update(
            account,
            HealthUpdate { error_count: Some(current + 1), ..Default::default() },
        )
    }

    pub fn get(&self, account: &str) -> Option<AccountHealth> {
        self.records.lock().get(account).cloned()
    }

    /// Fleet rollup over every known account.
    pub fn aggregate(&self) -> HealthAggregate {
        let mut accounts: Vec<AccountHealth> = self.records.lock().values().cloned().collect();
        accounts.sort_by(|a, b| a.account.cmp(&b.account));
        HealthAggregate::from_accounts(accounts)
    }

    pub fn known_accounts(&self) -> Vec<String> {
        self.records.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
