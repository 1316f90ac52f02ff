// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::open_memory_db;
use hub_core::{Message, MessageKind};

fn store() -> MessageStore {
    let store = MessageStore::new(open_memory_db().unwrap());
    store.init().unwrap();
    store
}

fn msg(from: &str, to: &str, content: &str, ts: u64) -> Message {
    Message::new(from, to, MessageKind::Message, content, ts)
}

#[test]
fn add_then_unread_round_trip() {
    let store = store();
    for i in 0..3u64 {
        store.add(&msg("alice", "bob", &format!("m{i}"), 100 + i)).unwrap();
    }
    store.add(&msg("alice", "carol", "other inbox", 50)).unwrap();

    let inbox = store.unread("bob").unwrap();
    assert_eq!(inbox.len(), 3);
    assert_eq!(
        inbox.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
        vec!["m0", "m1", "m2"]
    );
    assert!(inbox.iter().all(|m| !m.read && m.from == "alice"));
}

#[test]
fn unread_orders_by_timestamp_not_insert_order() {
    let store = store();
    store.add(&msg("a", "bob", "late", 900)).unwrap();
    store.add(&msg("a", "bob", "early", 100)).unwrap();
    let inbox = store.unread("bob").unwrap();
    assert_eq!(inbox[0].content, "early");
    assert_eq!(inbox[1].content, "late");
}

#[test]
fn mark_all_read_is_idempotent() {
    let store = store();
    store.add(&msg("a", "bob", "x", 1)).unwrap();
    store.add(&msg("a", "bob", "y", 2)).unwrap();

    assert_eq!(store.mark_all_read("bob").unwrap(), 2);
    assert!(store.unread("bob").unwrap().is_empty());
    assert_eq!(store.mark_all_read("bob").unwrap(), 0);
    assert!(store.unread("bob").unwrap().is_empty());
}

#[test]
fn paged_includes_read_messages() {
    let store = store();
    for i in 0..5u64 {
        store.add(&msg("a", "bob", &format!("m{i}"), i)).unwrap();
    }
    store.mark_all_read("bob").unwrap();

    let page = store.paged("bob", 2, 1).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].content, "m1");
    assert_eq!(page[1].content, "m2");
    assert!(page.iter().all(|m| m.read));
}

#[test]
fn archive_flags_old_read_messages_only() {
    let store = store();
    let day_ms = 24 * 60 * 60 * 1000;
    let now = 100 * day_ms;

    store.add(&msg("a", "bob", "old", 0)).unwrap();
    store.add(&msg("a", "bob", "fresh", now - day_ms)).unwrap();
    store.mark_all_read("bob").unwrap();

    let archived = store.archive_old(14, now).unwrap();
    assert_eq!(archived, 1); // "fresh" is read but inside the window

    // Archived rows drop out of paging; fresh one remains.
    let page = store.paged("bob", 10, 0).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].content, "fresh");
}

#[test]
fn archive_preserves_unread_regardless_of_age() {
    let store = store();
    let now = 100 * 24 * 60 * 60 * 1000;
    store.add(&msg("a", "bob", "old unread", 0)).unwrap();

    let archived = store.archive_old(14, now).unwrap();
    assert_eq!(archived, 0);
    assert_eq!(store.unread("bob").unwrap().len(), 1);
}

#[test]
fn context_round_trips() {
    let store = store();
    let mut context = std::collections::HashMap::new();
    context.insert("projectDir".to_string(), "/work/repo".to_string());
    let message =
        msg("a", "bob", "with ctx", 10).with_context(context.clone());
    let id = store.add(&message).unwrap();

    let loaded = store.get(id.as_str()).unwrap();
    assert_eq!(loaded.context, Some(context));
}

#[test]
fn get_missing_is_not_found() {
    let store = store();
    assert!(matches!(store.get("msg-none"), Err(StoreError::NotFound(_))));
}

#[test]
fn handoff_kind_round_trips() {
    let store = store();
    let message = Message::new("a", "bob", MessageKind::Handoff, "{\"goal\":\"g\"}", 5);
    let id = store.add(&message).unwrap();
    assert_eq!(store.get(id.as_str()).unwrap().kind, MessageKind::Handoff);
}
