// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff and task lifecycle handlers.

use std::collections::HashMap;

use hub_core::{
    kinds, sanitize_handoff, validate_account_name, validate_handoff, Clock, HandoffPayload,
    Message, MessageKind, Outcome, TaskStatus,
};
use hub_engine::{compute_evidence_hash, compute_spec_hash, ReviewBundle, Verdict};
use hub_wire::Reply;
use serde_json::json;
use tracing::{info, warn};

use super::messages::notify_message;
use super::ConnCtx;

/// `handoff_task`: validate, sanitize, persist the handoff message and its
/// task, notify the assignee.
pub(crate) fn handle_handoff(
    ctx: &ConnCtx,
    request_id: Option<String>,
    to: String,
    mut payload: HandoffPayload,
    context: Option<HashMap<String, String>>,
) -> Reply {
    if !validate_account_name(&to) {
        return Reply::error(request_id, format!("invalid recipient account name: {to}"));
    }

    payload.normalize();
    let errors = validate_handoff(&payload);
    if !errors.is_empty() {
        return Reply::validation_error(request_id, "Invalid handoff payload", errors);
    }
    let report = sanitize_handoff(&payload, context.as_ref());
    if report.is_blocked() {
        return Reply::validation_error(request_id, "Handoff payload rejected", report.blocks);
    }
    for warning in &report.warnings {
        warn!(
            account = %ctx.account,
            field = %warning.field,
            "suspicious handoff content: {}",
            warning.message
        );
    }

    let content = match serde_json::to_string(&payload) {
        Ok(content) => content,
        Err(err) => return Reply::error(request_id, err.to_string()),
    };

    let now = ctx.state.clock.epoch_ms();
    let mut message = Message::new(&ctx.account, &to, MessageKind::Handoff, content, now);
    if let Some(context) = context {
        message = message.with_context(context);
    }
    let handoff_id = match ctx.state.messages.add(&message) {
        Ok(id) => id,
        Err(err) => return Reply::error(request_id, err.to_string()),
    };

    let task = match ctx.state.tasks.create_from_handoff(handoff_id.as_str(), &to, &payload, now) {
        Ok(task) => task,
        Err(err) => return Reply::error(request_id, err.to_string()),
    };

    let delivered = notify_message(ctx, &to, &message);
    info!(from = %ctx.account, to = %to, task = %task.id, "handoff created");

    Reply::result(
        request_id,
        &json!({
            "handoffId": handoff_id,
            "taskId": task.id,
            "delivered": delivered,
            "queued": true,
            "warnings": report.warnings,
        }),
    )
}

/// `update_task_status`: run the transition; acceptance emits a
/// `TASK_VERIFIED` receipt bound to the originating handoff.
pub(crate) fn handle_update_status(
    ctx: &ConnCtx,
    request_id: Option<String>,
    task_id: String,
    status: String,
    reason: Option<String>,
) -> Reply {
    let Some(to) = TaskStatus::parse(&status) else {
        return Reply::error(request_id, format!("unknown task status: {status}"));
    };

    let now = ctx.state.clock.epoch_ms();
    let task = match ctx.state.tasks.update_status(&task_id, to, reason, now) {
        Ok(task) => task,
        Err(err) => return Reply::error(request_id, err.to_string()),
    };

    match to {
        TaskStatus::Accepted => {
            emit_verified(ctx, &task);
            record_outcome(ctx, &task, Outcome::Completed, now);
        }
        TaskStatus::Rejected => record_outcome(ctx, &task, Outcome::Rejected, now),
        _ => {}
    }

    Reply::result(request_id, &json!({ "task": task }))
}

/// Build and emit the acceptance receipt.
///
/// The spec hash covers the originating handoff's `{goal,
/// acceptance_criteria}`; when the handoff is gone, the task id stands in
/// for the goal.
fn emit_verified(ctx: &ConnCtx, task: &hub_core::Task) {
    let spec_hash = task
        .handoff_id
        .as_deref()
        .and_then(|handoff_id| ctx.state.messages.get(handoff_id).ok())
        .and_then(|message| serde_json::from_str::<HandoffPayload>(&message.content).ok())
        .map(|payload| compute_spec_hash(&payload.goal, &payload.acceptance_criteria))
        .unwrap_or_else(|| compute_spec_hash(task.id.as_str(), &[]));

    let receipt = json!({
        "taskId": task.id,
        "verifier": "council",
        "verdict": Verdict::Accept,
        "timestamp": ctx.state.clock.epoch_ms(),
        "specHash": spec_hash,
        "evidenceHash": compute_evidence_hash(&ReviewBundle::default()),
    });
    ctx.state.bus.emit_kind(kinds::TASK_VERIFIED, &json!({ "receipt": receipt }));
}

fn record_outcome(ctx: &ConnCtx, task: &hub_core::Task, outcome: Outcome, now: u64) {
    let Some(assignee) = &task.assignee else {
        return;
    };
    let duration_min = task.started_at.map(|started| {
        (now.saturating_sub(started) as f64) / 60_000.0
    });
    let was_critical = task.criticality == Some(hub_core::Criticality::Critical);
    if let Err(err) =
        ctx.state.trust.record_outcome(assignee, outcome, duration_min, was_critical, now)
    {
        warn!(account = %assignee, error = %err, "failed to record outcome");
    }
}

/// `report_progress`: update the task's progress report.
pub(crate) fn handle_report_progress(
    ctx: &ConnCtx,
    request_id: Option<String>,
    task_id: String,
    percent: f64,
) -> Reply {
    let now = ctx.state.clock.epoch_ms();
    match ctx.state.tasks.record_progress(&task_id, percent, now) {
        Ok(task) => Reply::result(request_id, &json!({ "task": task })),
        Err(err) => Reply::error(request_id, err.to_string()),
    }
}
