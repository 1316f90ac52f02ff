// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace end-to-end specs.
//!
//! Each scenario drives an in-process daemon over a real Unix socket with
//! line-framed JSON, the way account clients do. Council members are
//! scripted through the engine's fake caller.

use std::sync::Arc;

use hub_daemon::lifecycle::{self, HubState};
use hub_daemon::listener::Listener;
use hub_engine::{compute_spec_hash, FakeCaller, HealthProbe, ProbeResult, ScriptedReply};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;

struct Hub {
    state: Arc<HubState>,
    caller: Arc<FakeCaller>,
    cancel: CancellationToken,
    _lock: std::fs::File,
    _dir: tempfile::TempDir,
}

impl Drop for Hub {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn start_hub() -> Hub {
    start_hub_with_probe(None).await
}

async fn start_hub_with_probe(probe: Option<Arc<dyn HealthProbe>>) -> Hub {
    let dir = tempfile::tempdir().unwrap();
    let config = hub_core::HubConfig::load(Some(dir.path().to_path_buf())).unwrap();
    let caller = Arc::new(FakeCaller::new());
    let result = lifecycle::startup(config, Arc::clone(&caller) as _, probe).await.unwrap();
    for account in ["alice", "bob", "carol", "secret-1", "secret-2", "secret-3"] {
        result.state.tokens.issue(account, &format!("{account}-token")).unwrap();
    }

    let cancel = CancellationToken::new();
    tokio::spawn(Listener::new(result.listener, Arc::clone(&result.state)).run(cancel.clone()));
    Hub { state: result.state, caller, cancel, _lock: result.lock_file, _dir: dir }
}

struct Client {
    stream: UnixStream,
    parser: hub_wire::LineParser,
    pending: std::collections::VecDeque<Value>,
}

impl Client {
    async fn auth(hub: &Hub, account: &str) -> Client {
        let stream = UnixStream::connect(&hub.state.config.paths.socket_path).await.unwrap();
        let mut client =
            Client { stream, parser: hub_wire::LineParser::new(), pending: Default::default() };
        let reply = client
            .request(json!({
                "type": "auth",
                "account": account,
                "token": format!("{account}-token"),
            }))
            .await;
        assert_eq!(reply["type"], "auth_ok", "auth failed: {reply}");
        client
    }

    async fn send(&mut self, record: Value) {
        let bytes = hub_wire::encode(&record).unwrap();
        self.stream.write_all(&bytes).await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let mut buf = [0u8; 16 * 1024];
        loop {
            if let Some(record) = self.pending.pop_front() {
                return record;
            }
            let n = tokio::time::timeout(
                std::time::Duration::from_secs(10),
                self.stream.read(&mut buf),
            )
            .await
            .expect("timed out waiting for a reply")
            .unwrap();
            assert!(n > 0, "server closed the connection unexpectedly");
            self.pending.extend(self.parser.feed(&buf[..n]));
        }
    }

    /// Send a request and return the first non-stream reply.
    async fn request(&mut self, record: Value) -> Value {
        self.send(record).await;
        loop {
            let reply = self.recv().await;
            if reply["type"] != "stream_event" {
                return reply;
            }
        }
    }
}

// ── Scenario 1: send + receive ───────────────────────────────────────

#[tokio::test]
async fn send_and_receive_a_message() {
    let hub = start_hub().await;
    let mut alice = Client::auth(&hub, "alice").await;
    let reply = alice
        .request(json!({"type": "send_message", "to": "bob", "content": "hi"}))
        .await;
    assert_eq!(reply["type"], "result");
    assert_eq!(reply["queued"], true);
    assert_eq!(reply["delivered"], false); // bob is not connected yet

    let mut bob = Client::auth(&hub, "bob").await;
    let reply = bob.request(json!({"type": "read_messages"})).await;
    let messages = reply["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "hi");
    assert_eq!(messages[0]["from"], "alice");
    assert_eq!(messages[0]["read"], true);

    // Read cursor advanced: the inbox is now empty.
    let reply = bob.request(json!({"type": "read_messages"})).await;
    assert_eq!(reply["messages"].as_array().unwrap().len(), 0);
}

// ── Scenario 2: handoff validation ───────────────────────────────────

#[tokio::test]
async fn invalid_handoff_is_rejected_with_field_details() {
    let hub = start_hub().await;
    let mut alice = Client::auth(&hub, "alice").await;

    let reply = alice
        .request(json!({
            "type": "handoff_task",
            "to": "bob",
            "payload": {
                "goal": "fix the tests",
                "acceptance_criteria": [],
                "run_commands": ["cargo test"]
            }
        }))
        .await;

    assert_eq!(reply["type"], "error");
    assert_eq!(reply["error"], "Invalid handoff payload");
    let details = reply["details"].as_array().unwrap();
    assert!(details.iter().any(|d| d["field"] == "acceptance_criteria"));

    // Nothing was written.
    let mut bob = Client::auth(&hub, "bob").await;
    let reply = bob.request(json!({"type": "read_messages"})).await;
    assert_eq!(reply["messages"].as_array().unwrap().len(), 0);
    assert!(hub.state.tasks.all().is_empty());
}

// ── Scenario 3: task accept → receipt ────────────────────────────────

#[tokio::test]
async fn accepting_a_task_emits_a_receipt_bound_to_its_handoff() {
    let hub = start_hub().await;
    let mut alice = Client::auth(&hub, "alice").await;

    let handoff = |goal: &str| {
        json!({
            "type": "handoff_task",
            "to": "bob",
            "payload": {
                "goal": goal,
                "acceptance_criteria": [format!("{goal} verified")],
                "run_commands": ["cargo test"]
            }
        })
    };
    let _task1 = alice.request(handoff("first job")).await;
    let task2_reply = alice.request(handoff("second job")).await;
    let task2_id = task2_reply["taskId"].as_str().unwrap().to_string();

    let (_sub, mut events) = hub.state.bus.subscribe(vec!["TASK_VERIFIED".into()]);

    let mut bob = Client::auth(&hub, "bob").await;
    for status in ["in_progress", "ready_for_review", "accepted"] {
        let reply = bob
            .request(json!({
                "type": "update_task_status",
                "taskId": task2_id,
                "status": status
            }))
            .await;
        assert_eq!(reply["type"], "result", "transition to {status} failed: {reply}");
    }

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, "TASK_VERIFIED");
    let receipt = event.field("receipt").unwrap();
    assert_eq!(receipt["taskId"], task2_id);
    assert_eq!(
        receipt["specHash"],
        compute_spec_hash("second job", &["second job verified".to_string()]),
    );
    // Bound to task2's handoff, not task1's.
    assert_ne!(
        receipt["specHash"],
        compute_spec_hash("first job", &["first job verified".to_string()]),
    );
}

// ── Scenario 4: health probe failure ─────────────────────────────────

struct FailingProbe;

#[async_trait::async_trait]
impl HealthProbe for FailingProbe {
    async fn check(&self, _account: &str) -> ProbeResult {
        ProbeResult { ok: false, latency_ms: 3 }
    }
}

#[tokio::test]
async fn failed_probe_marks_account_critical_and_emits() {
    let hub = start_hub_with_probe(Some(Arc::new(FailingProbe))).await;
    let (_sub, mut events) = hub.state.bus.subscribe(vec!["ACCOUNT_HEALTH".into()]);

    // Drive one probe round directly instead of waiting five minutes.
    let checker = {
        let config = &hub.state.config.settings.health;
        Arc::new(hub_engine::HealthChecker::new(
            Arc::clone(&hub.state.health),
            hub.state.bus.clone(),
            Arc::new(FailingProbe),
            std::time::Duration::from_secs(config.check_interval_secs),
            std::time::Duration::from_secs(config.probe_timeout_secs),
        ))
    };
    checker.tick(vec!["x".to_string()]).await;

    assert_eq!(
        hub.state.health.get("x").unwrap().status,
        hub_core::HealthStatus::Critical
    );
    let event = events.recv().await.unwrap();
    assert_eq!(event.field("agent").unwrap(), "x");
    assert_eq!(event.field("status").unwrap(), "critical");
}

// ── Scenario 5: SLA ping ─────────────────────────────────────────────

#[tokio::test]
async fn thirty_five_minute_task_gets_exactly_one_ping() {
    use hub_core::Clock;
    let hub = start_hub().await;
    let state = &hub.state;

    let payload: hub_core::HandoffPayload = serde_json::from_value(json!({
        "goal": "long running work",
        "acceptance_criteria": ["done"],
        "run_commands": ["make"],
        "blocked_by": ["none"]
    }))
    .unwrap();
    let now = state.clock.epoch_ms();
    let task = state.tasks.create_from_handoff("m1", "bob", &payload, now).unwrap();
    state.tasks.update_status(task.id.as_str(), hub_core::TaskStatus::InProgress, None, now).unwrap();

    let snapshot: Vec<hub_engine::TaskSla> = state
        .tasks
        .in_progress()
        .iter()
        .map(hub_engine::TaskSla::from_task)
        .collect();
    let future = now + 35 * 60 * 1000;
    let actions = state.sla.evaluate(&snapshot, &Default::default(), future);

    assert_eq!(actions.len(), 1);
    assert!(matches!(
        &actions[0],
        hub_engine::ResponseAction::Ping { task_id } if *task_id == task.id.as_str()
    ));
}

// ── Scenario 6: council anonymization ────────────────────────────────

#[tokio::test]
async fn council_analysis_anonymizes_stage_two() {
    let hub = start_hub().await;
    let members = ["secret-1", "secret-2", "secret-3"];

    for (i, member) in members.iter().enumerate() {
        hub.caller.push_reply(
            member,
            ScriptedReply::text(format!(
                r#"{{"complexity":"simple","estimatedDurationMinutes":{},"requiredSkills":["rust"],"recommendedApproach":"direct","risks":[]}}"#,
                15 + i
            )),
        );
        hub.caller
            .push_reply(member, ScriptedReply::text(r#"{"ranking":[1,2,3],"reasoning":"ok"}"#));
    }
    hub.caller.push_reply(
        "carol",
        ScriptedReply::text(
            r#"{"consensusComplexity":"simple","consensusDurationMinutes":16,"consensusSkills":["rust"],"recommendedApproach":"direct","confidence":0.9}"#,
        ),
    );

    let mut alice = Client::auth(&hub, "alice").await;
    let reply = alice
        .request(json!({
            "type": "council_analyze",
            "goal": "tighten CI times",
            "members": members,
            "chairman": "carol",
            "requestId": "council-1"
        }))
        .await;

    assert_eq!(reply["type"], "result");
    assert_eq!(reply["requestId"], "council-1");
    let analysis = &reply["result"]["analysis"];
    assert_eq!(analysis["analyses"].as_array().unwrap().len(), 3);
    assert!(analysis["consensus"]["confidence"].as_f64().unwrap() > 0.0);

    for member in &members {
        let prompts = hub.caller.prompts_for(member);
        let stage2 = prompts
            .iter()
            .find(|p| p.contains("Rank them"))
            .expect("stage-2 prompt captured");
        for name in &members {
            assert!(!stage2.contains(name), "stage-2 prompt leaked {name}");
        }
        assert!(stage2.contains("Analysis A"));
        assert!(stage2.contains("Analysis B"));
        assert!(stage2.contains("Analysis C"));
    }

    // The run was persisted to the council cache.
    let cached = hub_store::ResultCache::new(&hub.state.config.paths.council_cache_path)
        .read_all()
        .unwrap();
    assert_eq!(cached.len(), 1);
}

// ── Council streaming over the requesting connection ─────────────────

#[tokio::test]
async fn council_discussion_streams_events_then_replies() {
    let hub = start_hub().await;
    hub.caller.push_reply("secret-1", ScriptedReply::text("research notes"));
    hub.caller.push_reply("secret-1", ScriptedReply::text("round one remark"));
    hub.caller.push_reply("carol", ScriptedReply::text("decision: proceed"));

    let mut alice = Client::auth(&hub, "alice").await;
    alice
        .send(json!({
            "type": "council_discussion",
            "goal": "refactor the parser",
            "members": ["secret-1"],
            "chairman": "carol",
            "rounds": 1,
            "requestId": "d1"
        }))
        .await;

    let mut saw_stage_start = false;
    let mut saw_chunk = false;
    loop {
        let record = alice.recv().await;
        match record["type"].as_str() {
            Some("stream_event") => {
                match record["event"]["type"].as_str() {
                    Some("COUNCIL_STAGE_START") => saw_stage_start = true,
                    Some("AGENT_STREAM_CHUNK") => saw_chunk = true,
                    _ => {}
                }
            }
            Some("result") => {
                assert_eq!(record["requestId"], "d1");
                assert_eq!(record["result"]["decision"], "decision: proceed");
                break;
            }
            other => panic!("unexpected reply type: {other:?}"),
        }
    }
    assert!(saw_stage_start, "expected COUNCIL_STAGE_START stream events");
    assert!(saw_chunk, "expected AGENT_STREAM_CHUNK stream events");
}
