// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hub_core::FakeClock;
use serde_json::json;
use std::time::Duration;

fn manager() -> (SharedSessionManager<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    (SharedSessionManager::new(clock.clone()), clock)
}

#[test]
fn self_pairing_is_rejected() {
    let (mgr, _) = manager();
    assert_eq!(mgr.create("alice", "alice", "/ws"), Err(SessionError::SelfPairing));
}

#[test]
fn join_is_participant_only() {
    let (mgr, _) = manager();
    let session = mgr.create("alice", "bob", "/ws").unwrap();
    let id = session.id.as_str();

    assert_eq!(mgr.join(id, "mallory"), Err(SessionError::NotParticipant));
    let joined = mgr.join(id, "bob").unwrap();
    assert!(joined.joined);
    assert!(joined.last_ping.contains_key("bob"));
}

#[test]
fn join_inactive_fails() {
    let (mgr, _) = manager();
    let session = mgr.create("alice", "bob", "/ws").unwrap();
    mgr.end(session.id.as_str(), "alice").unwrap();
    assert_eq!(mgr.join(session.id.as_str(), "bob"), Err(SessionError::Inactive));
}

#[test]
fn updates_respect_membership_and_cursor() {
    let (mgr, _) = manager();
    let session = mgr.create("alice", "bob", "/ws").unwrap();
    let id = session.id.as_str();
    mgr.join(id, "bob").unwrap();

    mgr.add_update(id, "alice", json!({"line": 1})).unwrap();
    mgr.add_update(id, "bob", json!({"line": 2})).unwrap();
    assert_eq!(
        mgr.add_update(id, "eve", json!({})),
        Err(SessionError::NotAMember { account: "eve".to_string() })
    );

    let first = mgr.updates_for(id, "bob").unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].from, "alice");

    // Cursor advanced: nothing new.
    assert!(mgr.updates_for(id, "bob").unwrap().is_empty());

    mgr.add_update(id, "alice", json!({"line": 3})).unwrap();
    let next = mgr.updates_for(id, "bob").unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].data, json!({"line": 3}));

    // alice's cursor is independent and sees everything once.
    assert_eq!(mgr.updates_for(id, "alice").unwrap().len(), 3);
}

#[test]
fn cleanup_marks_stale_sessions_inactive() {
    let (mgr, clock) = manager();
    let session = mgr.create("alice", "bob", "/ws").unwrap();
    let id = session.id.as_str().to_string();
    mgr.join(&id, "bob").unwrap();

    clock.advance(Duration::from_secs(60));
    assert!(mgr.cleanup_stale().is_empty());

    clock.advance(Duration::from_secs(31)); // both pings now > 90s old
    let deactivated = mgr.cleanup_stale();
    assert_eq!(deactivated.len(), 1);
    assert!(!mgr.get(&id).unwrap().active);
}

#[test]
fn one_fresh_ping_keeps_session_alive() {
    let (mgr, clock) = manager();
    let session = mgr.create("alice", "bob", "/ws").unwrap();
    let id = session.id.as_str().to_string();
    mgr.join(&id, "bob").unwrap();

    clock.advance(Duration::from_secs(89));
    mgr.ping(&id, "bob").unwrap();
    clock.advance(Duration::from_secs(10));

    assert!(mgr.cleanup_stale().is_empty());
    assert!(mgr.get(&id).unwrap().active);
}

#[test]
fn purge_drops_only_old_inactive_sessions() {
    let (mgr, clock) = manager();
    let old = mgr.create("alice", "bob", "/a").unwrap();
    mgr.end(old.id.as_str(), "alice").unwrap();

    clock.advance(Duration::from_secs(3600));
    let fresh = mgr.create("alice", "bob", "/b").unwrap();
    mgr.end(fresh.id.as_str(), "bob").unwrap();

    let purged = mgr.purge_inactive(1800 * 1000);
    assert_eq!(purged, 1);
    assert!(mgr.get(old.id.as_str()).is_err());
    assert!(mgr.get(fresh.id.as_str()).is_ok());
}

#[test]
fn sessions_for_lists_active_memberships() {
    let (mgr, _) = manager();
    mgr.create("alice", "bob", "/a").unwrap();
    let ended = mgr.create("alice", "carol", "/b").unwrap();
    mgr.end(ended.id.as_str(), "alice").unwrap();

    let sessions = mgr.sessions_for("alice");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].participant, "bob");
}
