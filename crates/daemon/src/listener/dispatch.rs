// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request dispatch: one typed request in, one reply out.

use hub_core::Clock;
use hub_engine::SubscriptionHandle;
use hub_wire::{Reply, Request};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::{council, messages, sessions, tasks, ConnCtx};
use crate::env;

/// Dispatch a request, enforcing the per-request timeout class.
pub(crate) async fn dispatch(
    ctx: &ConnCtx,
    request_id: Option<String>,
    request: Request,
    subscription: &mut Option<SubscriptionHandle>,
) -> Reply {
    debug!(account = %ctx.account, request = request_kind(&request), "dispatching");

    // Council runs stream for minutes; everything else is a quick call.
    let timeout = match request {
        Request::CouncilAnalyze { .. }
        | Request::CouncilDiscussion { .. }
        | Request::VerifyTask { .. } => env::council_timeout(),
        _ => env::request_timeout(),
    };

    let fut = dispatch_inner(ctx, request_id.clone(), request, subscription);
    match tokio::time::timeout(timeout, fut).await {
        Ok(reply) => reply,
        Err(_) => Reply::error(request_id, "request timed out"),
    }
}

async fn dispatch_inner(
    ctx: &ConnCtx,
    request_id: Option<String>,
    request: Request,
    subscription: &mut Option<SubscriptionHandle>,
) -> Reply {
    match request {
        // A second auth on an authenticated connection is a no-op ack.
        // Echo the established identity, never the claimed one: the
        // payload here is unverified client input.
        Request::Auth { .. } => {
            Reply::AuthOk { account: ctx.account.clone(), request_id }
        }

        Request::Ping => Reply::result(request_id, &json!({ "pong": true })),

        Request::SendMessage { to, content, context } => {
            messages::handle_send(ctx, request_id, to, content, context)
        }

        Request::ReadMessages { limit, offset } => {
            messages::handle_read(ctx, request_id, limit, offset)
        }

        Request::ArchiveMessages { days } => messages::handle_archive(ctx, request_id, days),

        Request::HandoffTask { to, payload, context } => {
            tasks::handle_handoff(ctx, request_id, to, payload, context)
        }

        Request::UpdateTaskStatus { task_id, status, reason } => {
            tasks::handle_update_status(ctx, request_id, task_id, status, reason)
        }

        Request::ReportProgress { task_id, percent } => {
            tasks::handle_report_progress(ctx, request_id, task_id, percent)
        }

        Request::VerifyTask { task_id, bundle, members, chairman } => {
            council::handle_verify(ctx, request_id, task_id, bundle, members, chairman).await
        }

        Request::Subscribe { patterns, replay } => {
            // Late subscribers can ask for ring history before live events.
            if let Some(count) = replay {
                let recent = ctx.state.bus.recent(count as usize);
                for event in recent {
                    if patterns.iter().any(|p| hub_core::event::pattern_matches(p, &event.kind))
                    {
                        let _ = ctx.tx.send(Reply::StreamEvent { event });
                    }
                }
            }
            match subscription {
                Some(handle) => ctx.state.bus.add_patterns(handle, &patterns),
                None => {
                    let (handle, mut rx) = ctx.state.bus.subscribe(patterns);
                    let tx = ctx.tx.clone();
                    tokio::spawn(async move {
                        while let Some(event) = rx.recv().await {
                            if tx.send(Reply::StreamEvent { event }).is_err() {
                                break;
                            }
                        }
                    });
                    *subscription = Some(handle);
                }
            }
            Reply::result(request_id, &json!({ "subscribed": true }))
        }

        Request::Unsubscribe { patterns } => {
            if let Some(handle) = subscription {
                ctx.state.bus.remove_patterns(handle, &patterns);
            }
            Reply::result(request_id, &json!({ "subscribed": true }))
        }

        Request::CouncilAnalyze { goal, members, chairman } => {
            council::handle_analyze(ctx, request_id, goal, members, chairman).await
        }

        Request::CouncilDiscussion { goal, members, chairman, rounds } => {
            council::handle_discussion(ctx, request_id, goal, members, chairman, rounds).await
        }

        Request::ShareSession { participant, workspace } => {
            sessions::handle_share(ctx, request_id, participant, workspace)
        }

        Request::JoinSession { session_id } => sessions::handle_join(ctx, request_id, session_id),

        Request::SessionBroadcast { session_id, data } => {
            sessions::handle_broadcast(ctx, request_id, session_id, data)
        }

        Request::SessionPing { session_id } => sessions::handle_ping(ctx, request_id, session_id),

        Request::SessionStatus { session_id } => {
            sessions::handle_status(ctx, request_id, session_id)
        }

        Request::SessionHistory { session_id } => {
            sessions::handle_history(ctx, request_id, session_id)
        }

        Request::LeaveSession { session_id } => {
            sessions::handle_leave(ctx, request_id, session_id)
        }

        Request::ListAccounts => {
            #[derive(Serialize)]
            struct Entry {
                account: String,
                status: &'static str,
            }
            let accounts: Vec<Entry> = ctx
                .state
                .registry
                .connected_accounts()
                .into_iter()
                .map(|account| Entry { account, status: "active" })
                .collect();
            Reply::result(request_id, &json!({ "accounts": accounts }))
        }

        Request::GetHealth => {
            let aggregate = ctx.state.health.aggregate();
            Reply::result(request_id, &aggregate)
        }

        Request::GetReputation { account } => {
            let target = account.unwrap_or_else(|| ctx.account.clone());
            let now = ctx.state.clock.epoch_ms();
            match ctx.state.trust.get(&target, now) {
                Ok(reputation) => Reply::result(request_id, &json!({ "reputation": reputation })),
                Err(err) => Reply::error(request_id, err.to_string()),
            }
        }

        Request::Shutdown => {
            ctx.state.shutdown.notify_one();
            Reply::result(request_id, &json!({ "stopping": true }))
        }
    }
}

fn request_kind(request: &Request) -> &'static str {
    match request {
        Request::Auth { .. } => "auth",
        Request::Ping => "ping",
        Request::SendMessage { .. } => "send_message",
        Request::ReadMessages { .. } => "read_messages",
        Request::ArchiveMessages { .. } => "archive_messages",
        Request::HandoffTask { .. } => "handoff_task",
        Request::UpdateTaskStatus { .. } => "update_task_status",
        Request::ReportProgress { .. } => "report_progress",
        Request::VerifyTask { .. } => "verify_task",
        Request::Subscribe { .. } => "subscribe",
        Request::Unsubscribe { .. } => "unsubscribe",
        Request::CouncilAnalyze { .. } => "council_analyze",
        Request::CouncilDiscussion { .. } => "council_discussion",
        Request::ShareSession { .. } => "share_session",
        Request::JoinSession { .. } => "join_session",
        Request::SessionBroadcast { .. } => "session_broadcast",
        Request::SessionPing { .. } => "session_ping",
        Request::SessionStatus { .. } => "session_status",
        Request::SessionHistory { .. } => "session_history",
        Request::LeaveSession { .. } => "leave_session",
        Request::ListAccounts => "list_accounts",
        Request::GetHealth => "get_health",
        Request::GetReputation { .. } => "get_reputation",
        Request::Shutdown => "shutdown",
    }
}
