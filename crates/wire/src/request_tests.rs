// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn parse(value: serde_json::Value) -> Envelope {
    serde_json::from_value(value).unwrap()
}

#[test]
fn auth_record_parses() {
    let env = parse(json!({"type": "auth", "account": "alice", "token": "s3cret", "requestId": "r1"}));
    assert_eq!(env.request_id.as_deref(), Some("r1"));
    assert_eq!(
        env.request,
        Request::Auth { account: "alice".into(), token: "s3cret".into() }
    );
}

#[test]
fn request_id_is_optional() {
    let env = parse(json!({"type": "ping"}));
    assert_eq!(env.request_id, None);
    assert_eq!(env.request, Request::Ping);
}

#[test]
fn send_message_parses() {
    let env = parse(json!({"type": "send_message", "to": "bob", "content": "hi"}));
    match env.request {
        Request::SendMessage { to, content, context } => {
            assert_eq!(to, "bob");
            assert_eq!(content, "hi");
            assert_eq!(context, None);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn update_task_status_uses_camel_case_fields() {
    let env = parse(json!({
        "type": "update_task_status",
        "taskId": "task-1",
        "status": "in_progress"
    }));
    match env.request {
        Request::UpdateTaskStatus { task_id, status, reason } => {
            assert_eq!(task_id, "task-1");
            assert_eq!(status, "in_progress");
            assert_eq!(reason, None);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn handoff_task_carries_payload() {
    let env = parse(json!({
        "type": "handoff_task",
        "to": "bob",
        "payload": {
            "goal": "fix the bug",
            "acceptance_criteria": ["tests pass"],
            "run_commands": ["cargo test"]
        }
    }));
    match env.request {
        Request::HandoffTask { payload, .. } => {
            assert_eq!(payload.goal, "fix the bug");
            assert!(payload.blocked_by.is_empty()); // defaulting happens later
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn unknown_type_fails_to_parse() {
    let result: Result<Envelope, _> =
        serde_json::from_value(json!({"type": "mystery", "x": 1}));
    assert!(result.is_err());
}

#[test]
fn round_trip_is_stable() {
    let env = Envelope {
        request_id: Some("r9".into()),
        request: Request::Subscribe { patterns: vec!["COUNCIL_*".into()], replay: None },
    };
    let value = serde_json::to_value(&env).unwrap();
    assert_eq!(value["type"], "subscribe");
    assert_eq!(value["requestId"], "r9");
    assert_eq!(parse(value), env);
}
