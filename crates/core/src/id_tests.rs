// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_ids_carry_prefix_and_are_unique() {
    let a = TaskId::new();
    let b = TaskId::new();
    assert!(a.as_str().starts_with("task-"));
    assert_ne!(a, b);
}

#[test]
fn suffix_strips_prefix() {
    let id = MessageId::from_string("msg-abc123");
    assert_eq!(id.suffix(), "abc123");
}

#[test]
fn suffix_tolerates_missing_prefix() {
    let id = MessageId::from_string("raw");
    assert_eq!(id.suffix(), "raw");
}

#[test]
fn serde_is_transparent() {
    let id = SessionId::from_string("ses-xyz");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"ses-xyz\"");
    let back: SessionId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn short_truncates() {
    assert_eq!(short("abcdef", 3), "abc");
    assert_eq!(short("ab", 3), "ab");
}
