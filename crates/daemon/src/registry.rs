// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connected-accounts registry.
//!
//! The listener owns connect/disconnect; everything else only reads. Each
//! entry carries the connection's outbound queue so other subsystems can
//! push replies (notifications) to a live client.

use std::collections::HashMap;
use std::sync::Arc;

use hub_wire::Reply;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Handle to one authenticated connection.
#[derive(Clone)]
pub struct ConnHandle {
    pub account: String,
    /// Outbound queue drained by the connection's writer task.
    pub tx: mpsc::UnboundedSender<Reply>,
    pub connected_at: u64,
}

/// Mutex-protected map of account name → live connection.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<HashMap<String, ConnHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly authenticated connection. A newer connection for
    /// the same account replaces the old entry; the old writer task ends
    /// when its socket closes.
    pub fn insert(&self, handle: ConnHandle) {
        self.inner.lock().insert(handle.account.clone(), handle);
    }

    /// Remove an account's entry, but only if it still belongs to the
    /// given sender (a reconnect may have replaced it).
    pub fn remove(&self, account: &str, tx: &mpsc::UnboundedSender<Reply>) {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.get(account) {
            if existing.tx.same_channel(tx) {
                inner.remove(account);
            }
        }
    }

    pub fn is_connected(&self, account: &str) -> bool {
        self.inner.lock().contains_key(account)
    }

    /// Push a reply to an account's connection, if connected.
    pub fn notify(&self, account: &str, reply: Reply) -> bool {
        let inner = self.inner.lock();
        match inner.get(account) {
            Some(handle) => handle.tx.send(reply).is_ok(),
            None => false,
        }
    }

    /// Names of currently connected accounts, sorted.
    pub fn connected_accounts(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
