// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Council request handlers: stream engine events back on the requesting
//! connection and onto the bus, then reply with the structured result.

use hub_core::{kinds, validate_account_name, HandoffPayload, HubEvent};
use hub_engine::{
    requires_council_verification, requires_human_review, CouncilConfig, CouncilEvent,
    ReviewBundle,
};
use hub_wire::Reply;
use serde_json::json;
use tokio::sync::mpsc;

use super::ConnCtx;

pub(crate) async fn handle_analyze(
    ctx: &ConnCtx,
    request_id: Option<String>,
    goal: String,
    members: Vec<String>,
    chairman: String,
) -> Reply {
    let config = match council_config(goal, members, chairman, None, ctx) {
        Ok(config) => config,
        Err(message) => return Reply::error(request_id, message),
    };
    let events = spawn_event_fanout(ctx);
    let result = ctx
        .state
        .council
        .run_analysis(config, events, ctx.cancel.child_token())
        .await;
    Reply::result(request_id, &json!({ "result": result }))
}

pub(crate) async fn handle_discussion(
    ctx: &ConnCtx,
    request_id: Option<String>,
    goal: String,
    members: Vec<String>,
    chairman: String,
    rounds: Option<u32>,
) -> Reply {
    let config = match council_config(goal, members, chairman, rounds, ctx) {
        Ok(config) => config,
        Err(message) => return Reply::error(request_id, message),
    };
    let events = spawn_event_fanout(ctx);
    let result = ctx
        .state
        .council
        .run_discussion(config, events, ctx.cancel.child_token())
        .await;
    Reply::result(request_id, &json!({ "result": result }))
}

/// `verify_task`: run council verification over a submitted task.
///
/// Gating first: auto-testable handoffs bypass the council, and handoffs
/// the cognitive-friction rules reserve for humans are refused outright.
pub(crate) async fn handle_verify(
    ctx: &ConnCtx,
    request_id: Option<String>,
    task_id: String,
    bundle: serde_json::Value,
    members: Vec<String>,
    chairman: String,
) -> Reply {
    let Some(task) = ctx.state.tasks.get(&task_id) else {
        return Reply::error(request_id, format!("task not found: {task_id}"));
    };
    let handoff = task
        .handoff_id
        .as_deref()
        .and_then(|id| ctx.state.messages.get(id).ok())
        .and_then(|message| serde_json::from_str::<HandoffPayload>(&message.content).ok());
    let Some(handoff) = handoff else {
        return Reply::error(request_id, format!("no handoff payload for task {task_id}"));
    };

    if requires_human_review(handoff.criticality, handoff.reversibility) {
        return Reply::error(request_id, "task requires human review and cannot be auto-verified");
    }
    if !requires_council_verification(handoff.verifiability) {
        return Reply::result(
            request_id,
            &json!({ "bypassed": true, "reason": "auto-testable handoff" }),
        );
    }
    if let Some(bad) = members.iter().find(|m| !validate_account_name(m)) {
        return Reply::error(request_id, format!("invalid member account name: {bad}"));
    }

    let bundle: ReviewBundle = if bundle.is_null() {
        ReviewBundle::default()
    } else {
        match serde_json::from_value(bundle) {
            Ok(bundle) => bundle,
            Err(err) => return Reply::error(request_id, format!("invalid review bundle: {err}")),
        }
    };

    let events = spawn_event_fanout(ctx);
    let result = ctx
        .state
        .verifier
        .run(&task_id, &bundle, &handoff, &members, &chairman, &events, &ctx.cancel.child_token())
        .await;

    ctx.state.bus.emit_kind(kinds::TASK_VERIFIED, &json!({ "receipt": result.receipt }));
    Reply::result(request_id, &json!({ "verification": result }))
}

fn council_config(
    goal: String,
    members: Vec<String>,
    chairman: String,
    rounds: Option<u32>,
    ctx: &ConnCtx,
) -> Result<CouncilConfig, String> {
    if goal.trim().is_empty() {
        return Err("goal must be non-empty".to_string());
    }
    if let Some(bad) = members.iter().find(|m| !validate_account_name(m)) {
        return Err(format!("invalid member account name: {bad}"));
    }
    if !validate_account_name(&chairman) {
        return Err(format!("invalid chairman account name: {chairman}"));
    }
    let rounds = rounds.unwrap_or(ctx.state.council.settings().max_rounds).max(1);
    Ok(CouncilConfig { goal, members, chairman, rounds })
}

/// Forward engine events to this connection as `stream_event`s and mirror
/// them onto the bus for other subscribers.
fn spawn_event_fanout(ctx: &ConnCtx) -> mpsc::UnboundedSender<CouncilEvent> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<CouncilEvent>();
    let bus = ctx.state.bus.clone();
    let conn_tx = ctx.tx.clone();
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if let Some((kind, payload)) = bus_event(&event) {
                let emitted = bus.emit(HubEvent::from_payload(kind, &payload));
                let _ = conn_tx.send(Reply::StreamEvent { event: emitted });
            }
        }
    });
    events_tx
}

/// Map an engine event to its public bus form.
fn bus_event(event: &CouncilEvent) -> Option<(&'static str, serde_json::Value)> {
    match event {
        CouncilEvent::PhaseStart { phase } => {
            Some((kinds::COUNCIL_STAGE_START, json!({ "phase": phase })))
        }
        CouncilEvent::MemberStart { account, phase } => Some((
            kinds::AGENT_STREAM_CHUNK,
            json!({ "account": account, "phase": phase, "chunkType": "member_start" }),
        )),
        CouncilEvent::MemberChunk { chunk } => {
            let mut chunk = chunk.clone();
            if chunk.content.len() > hub_wire::MAX_STREAM_CHUNK {
                let mut cut = hub_wire::MAX_STREAM_CHUNK;
                while cut > 0 && !chunk.content.is_char_boundary(cut) {
                    cut -= 1;
                }
                chunk.content.truncate(cut);
            }
            Some((kinds::AGENT_STREAM_CHUNK, json!({ "chunk": chunk })))
        }
        CouncilEvent::MemberDone { account, phase } => Some((
            kinds::COUNCIL_MEMBER_RESPONSE,
            json!({ "account": account, "phase": phase }),
        )),
        CouncilEvent::PhaseComplete { phase } => {
            Some((kinds::COUNCIL_STAGE_COMPLETE, json!({ "phase": phase })))
        }
        CouncilEvent::Error { message } => {
            Some((kinds::COUNCIL_SESSION_END, json!({ "error": message })))
        }
        CouncilEvent::Done { result } => Some((
            kinds::COUNCIL_SESSION_END,
            json!({ "goal": result.goal, "hasDecision": result.decision.is_some() }),
        )),
    }
}
