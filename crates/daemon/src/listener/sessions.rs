// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared-session request handlers.

use hub_wire::Reply;
use serde_json::{json, Value};

use super::ConnCtx;

pub(crate) fn handle_share(
    ctx: &ConnCtx,
    request_id: Option<String>,
    participant: String,
    workspace: String,
) -> Reply {
    match ctx.state.sessions.create(&ctx.account, &participant, &workspace) {
        Ok(session) => Reply::result(request_id, &json!({ "session": session })),
        Err(err) => Reply::error(request_id, err.to_string()),
    }
}

pub(crate) fn handle_join(ctx: &ConnCtx, request_id: Option<String>, session_id: String) -> Reply {
    match ctx.state.sessions.join(&session_id, &ctx.account) {
        Ok(session) => Reply::result(request_id, &json!({ "session": session })),
        Err(err) => Reply::error(request_id, err.to_string()),
    }
}

pub(crate) fn handle_broadcast(
    ctx: &ConnCtx,
    request_id: Option<String>,
    session_id: String,
    data: Value,
) -> Reply {
    match ctx.state.sessions.add_update(&session_id, &ctx.account, data) {
        Ok(()) => Reply::result(request_id, &json!({ "broadcast": true })),
        Err(err) => Reply::error(request_id, err.to_string()),
    }
}

pub(crate) fn handle_ping(ctx: &ConnCtx, request_id: Option<String>, session_id: String) -> Reply {
    match ctx.state.sessions.ping(&session_id, &ctx.account) {
        Ok(()) => Reply::result(request_id, &json!({ "pinged": true })),
        Err(err) => Reply::error(request_id, err.to_string()),
    }
}

pub(crate) fn handle_status(
    ctx: &ConnCtx,
    request_id: Option<String>,
    session_id: String,
) -> Reply {
    match ctx.state.sessions.get(&session_id) {
        Ok(session) => Reply::result(request_id, &json!({ "session": session })),
        Err(err) => Reply::error(request_id, err.to_string()),
    }
}

pub(crate) fn handle_history(
    ctx: &ConnCtx,
    request_id: Option<String>,
    session_id: String,
) -> Reply {
    match ctx.state.sessions.updates_for(&session_id, &ctx.account) {
        Ok(updates) => Reply::result(request_id, &json!({ "updates": updates })),
        Err(err) => Reply::error(request_id, err.to_string()),
    }
}

pub(crate) fn handle_leave(ctx: &ConnCtx, request_id: Option<String>, session_id: String) -> Reply {
    match ctx.state.sessions.end(&session_id, &ctx.account) {
        Ok(session) => Reply::result(request_id, &json!({ "session": session })),
        Err(err) => Reply::error(request_id, err.to_string()),
    }
}
