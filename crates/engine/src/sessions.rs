// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ephemeral pairwise shared sessions.
//!
//! A session pairs an initiator with one participant over a workspace.
//! Updates go into a bounded per-session ring; each member keeps its own
//! read cursor. Sessions go inactive when every member's ping is stale
//! (90 s) or a member ends them; inactive sessions are purged later.

use std::collections::HashMap;

use hub_core::{Clock, SessionId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Liveness window: a session with no ping from any member for this long
/// is considered stale.
pub const STALE_AFTER_MS: u64 = 90 * 1000;

/// Bounded ring size for session updates.
const MAX_UPDATES: usize = 512;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("cannot open a shared session with yourself")]
    SelfPairing,

    #[error("{account} is not a member of this session")]
    NotAMember { account: String },

    #[error("only the invited participant may join")]
    NotParticipant,

    #[error("session is no longer active")]
    Inactive,
}

/// One broadcast update inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub from: String,
    pub data: Value,
    pub timestamp: u64,
}

/// A pairwise shared session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedSession {
    pub id: SessionId,
    pub initiator: String,
    pub participant: String,
    pub workspace: String,
    pub started_at: u64,
    pub active: bool,
    pub joined: bool,
    /// Last liveness ping per member, epoch ms.
    pub last_ping: HashMap<String, u64>,
}

impl SharedSession {
    pub fn is_member(&self, account: &str) -> bool {
        self.initiator == account || self.participant == account
    }
}

struct SessionState {
    session: SharedSession,
    updates: Vec<SessionUpdate>,
    /// Absolute index of `updates[0]` in the session's full history;
    /// advances as the ring discards old entries.
    base_index: u64,
    /// Per-member read cursor as an absolute update index.
    cursors: HashMap<String, u64>,
}

/// Manager for all shared sessions.
pub struct SharedSessionManager<C: Clock> {
    sessions: Mutex<HashMap<SessionId, SessionState>>,
    clock: C,
}

impl<C: Clock> SharedSessionManager<C> {
    pub fn new(clock: C) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), clock }
    }

    /// Open a session. The initiator is pinged immediately; the
    /// participant has not joined yet.
    pub fn create(
        &self,
        initiator: &str,
        participant: &str,
        workspace: &str,
    ) -> Result<SharedSession, SessionError> {
        if initiator == participant {
            return Err(SessionError::SelfPairing);
        }
        let now = self.clock.epoch_ms();
        let session = SharedSession {
            id: SessionId::new(),
            initiator: initiator.to_string(),
            participant: participant.to_string(),
            workspace: workspace.to_string(),
            started_at: now,
            active: true,
            joined: false,
            last_ping: HashMap::from([(initiator.to_string(), now)]),
        };
        self.sessions.lock().insert(
            session.id.clone(),
            SessionState {
                session: session.clone(),
                updates: Vec::new(),
                base_index: 0,
                cursors: HashMap::new(),
            },
        );
        Ok(session)
    }

    /// Join as the declared participant. Only valid while active.
    pub fn join(&self, id: &str, account: &str) -> Result<SharedSession, SessionError> {
        let now = self.clock.epoch_ms();
        let mut sessions = self.sessions.lock();
        let state = lookup(&mut sessions, id)?;
        if !state.session.active {
            return Err(SessionError::Inactive);
        }
        if state.session.participant != account {
            return Err(SessionError::NotParticipant);
        }
        state.session.joined = true;
        state.session.last_ping.insert(account.to_string(), now);
        Ok(state.session.clone())
    }

    /// Append an update to the session ring. Members only, active only.
    pub fn add_update(&self, id: &str, from: &str, data: Value) -> Result<(), SessionError> {
        let now = self.clock.epoch_ms();
        let mut sessions = self.sessions.lock();
        let state = lookup(&mut sessions, id)?;
        if !state.session.active {
            return Err(SessionError::Inactive);
        }
        if !state.session.is_member(from) {
            return Err(SessionError::NotAMember { account: from.to_string() });
        }
        state.session.last_ping.insert(from.to_string(), now);
        state.updates.push(SessionUpdate { from: from.to_string(), data, timestamp: now });
        if state.updates.len() > MAX_UPDATES {
            let overflow = state.updates.len() - MAX_UPDATES;
            state.updates.drain(..overflow);
            state.base_index += overflow as u64;
        }
        Ok(())
    }

    /// Updates strictly after the account's cursor; advances the cursor.
    pub fn updates_for(&self, id: &str, account: &str) -> Result<Vec<SessionUpdate>, SessionError> {
        let mut sessions = self.sessions.lock();
        let state = lookup(&mut sessions, id)?;
        if !state.session.is_member(account) {
            return Err(SessionError::NotAMember { account: account.to_string() });
        }
        let cursor = state.cursors.get(account).copied().unwrap_or(0);
        let start = cursor.saturating_sub(state.base_index) as usize;
        let fresh: Vec<SessionUpdate> = state.updates.iter().skip(start).cloned().collect();
        let new_cursor = state.base_index + state.updates.len() as u64;
        state.cursors.insert(account.to_string(), new_cursor);
        Ok(fresh)
    }

    /// Liveness ping from a member.
    pub fn ping(&self, id: &str, account: &str) -> Result<(), SessionError> {
        let now = self.clock.epoch_ms();
        let mut sessions = self.sessions.lock();
        let state = lookup(&mut sessions, id)?;
        if !state.session.is_member(account) {
            return Err(SessionError::NotAMember { account: account.to_string() });
        }
        state.session.last_ping.insert(account.to_string(), now);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<SharedSession, SessionError> {
        let mut sessions = self.sessions.lock();
        Ok(lookup(&mut sessions, id)?.session.clone())
    }

    /// End a session (member request). Idempotent on inactive sessions.
    pub fn end(&self, id: &str, account: &str) -> Result<SharedSession, SessionError> {
        let mut sessions = self.sessions.lock();
        let state = lookup(&mut sessions, id)?;
        if !state.session.is_member(account) {
            return Err(SessionError::NotAMember { account: account.to_string() });
        }
        state.session.active = false;
        Ok(state.session.clone())
    }

    /// Mark sessions inactive when every member ping is stale. Returns the
    /// ids that were deactivated.
    pub fn cleanup_stale(&self) -> Vec<SessionId> {
        let now = self.clock.epoch_ms();
        let mut deactivated = Vec::new();
        let mut sessions = self.sessions.lock();
        for state in sessions.values_mut() {
            if !state.session.active {
                continue;
            }
            let all_stale = state
                .session
                .last_ping
                .values()
                .all(|&at| now.saturating_sub(at) > STALE_AFTER_MS);
            if all_stale {
                state.session.active = false;
                deactivated.push(state.session.id.clone());
            }
        }
        deactivated
    }

    /// Drop inactive sessions started before the age bound. Returns the
    /// number purged.
    pub fn purge_inactive(&self, older_than_ms: u64) -> usize {
        let now = self.clock.epoch_ms();
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, state| {
            state.session.active
                || now.saturating_sub(state.session.started_at) < older_than_ms
        });
        before - sessions.len()
    }

    /// Active sessions an account belongs to.
    pub fn sessions_for(&self, account: &str) -> Vec<SharedSession> {
        self.sessions
            .lock()
            .values()
            .filter(|state| state.session.active && state.session.is_member(account))
            .map(|state| state.session.clone())
            .collect()
    }
}

fn lookup<'a>(
    sessions: &'a mut HashMap<SessionId, SessionState>,
    id: &str,
) -> Result<&'a mut SessionState, SessionError> {
    sessions
        .get_mut(&SessionId::from_string(id))
        .ok_or_else(|| SessionError::NotFound(id.to_string()))
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
