// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    simple = { "alice", true },
    digits_first = { "0main", true },
    hyphen = { "agent-7", true },
    underscore = { "bg_worker", true },
    max_len = { "a23456789012345678901234567890123456789012345678901234567890123", true },
    empty = { "", false },
    leading_hyphen = { "-alice", false },
    leading_underscore = { "_alice", false },
    space = { "a lice", false },
    dot = { "a.lice", false },
    too_long = { "a234567890123456789012345678901234567890123456789012345678901234", false },
)]
fn account_name_rule(name: &str, ok: bool) {
    assert_eq!(validate_account_name(name), ok, "{name:?}");
}

#[parameterized(
    lowercase = { "#a1b2c3", true },
    uppercase = { "#A1B2C3", true },
    short = { "#abc", false },
    long = { "#a1b2c3d", false },
    no_hash = { "a1b2c3", false },
    non_hex = { "#a1b2cg", false },
)]
fn color_rule(color: &str, ok: bool) {
    assert_eq!(validate_color(color), ok, "{color:?}");
}

#[test]
fn account_name_parse_round_trips() {
    let name = AccountName::parse("bob").unwrap();
    assert_eq!(name.as_str(), "bob");
    assert!(AccountName::parse("!bob").is_none());
}

#[test]
fn provider_serializes_kebab_case() {
    let json = serde_json::to_string(&Provider::ClaudeCode).unwrap();
    assert_eq!(json, "\"claude-code\"");
    let back: Provider = serde_json::from_str("\"cursor-agent\"").unwrap();
    assert_eq!(back, Provider::CursorAgent);
    assert_eq!(back.as_str(), "cursor-agent");
}
