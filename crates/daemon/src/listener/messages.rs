// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message request handlers.

use std::collections::HashMap;

use hub_core::{kinds, validate_account_name, Clock, Message, MessageKind};
use hub_wire::Reply;
use serde_json::json;
use tracing::warn;

use super::ConnCtx;

/// `send_message`: queue for the recipient, notify if connected.
pub(crate) fn handle_send(
    ctx: &ConnCtx,
    request_id: Option<String>,
    to: String,
    content: String,
    context: Option<HashMap<String, String>>,
) -> Reply {
    if !validate_account_name(&to) {
        return Reply::error(request_id, format!("invalid recipient account name: {to}"));
    }

    let now = ctx.state.clock.epoch_ms();
    let mut message = Message::new(&ctx.account, &to, MessageKind::Message, content, now);
    if let Some(context) = context {
        message = message.with_context(context);
    }

    if let Err(err) = ctx.state.messages.add(&message) {
        warn!(error = %err, "failed to store message");
        return Reply::error(request_id, err.to_string());
    }

    let delivered = notify_message(ctx, &to, &message);
    Reply::result(request_id, &json!({ "delivered": delivered, "queued": true }))
}

/// Emit `MESSAGE_RECEIVED` and push a notification to the recipient's live
/// connection. Returns whether the recipient is connected.
pub(crate) fn notify_message(ctx: &ConnCtx, to: &str, message: &Message) -> bool {
    let event = ctx.state.bus.emit_kind(
        kinds::MESSAGE_RECEIVED,
        &json!({
            "messageId": message.id,
            "from": message.from,
            "to": to,
            "kind": message.kind,
        }),
    );
    ctx.state.registry.notify(to, Reply::StreamEvent { event })
}

/// `read_messages`: unread + mark-read without paging; a page otherwise.
pub(crate) fn handle_read(
    ctx: &ConnCtx,
    request_id: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Reply {
    let store = &ctx.state.messages;
    let result = if limit.is_none() && offset.is_none() {
        store.unread(&ctx.account).and_then(|mut inbox| {
            store.mark_all_read(&ctx.account)?;
            for message in &mut inbox {
                message.read = true;
            }
            Ok(inbox)
        })
    } else {
        store.paged(&ctx.account, limit.unwrap_or(50), offset.unwrap_or(0))
    };

    match result {
        Ok(messages) => Reply::result(request_id, &json!({ "messages": messages })),
        Err(err) => Reply::error(request_id, err.to_string()),
    }
}

/// `archive_messages`: flag old read messages.
pub(crate) fn handle_archive(ctx: &ConnCtx, request_id: Option<String>, days: u32) -> Reply {
    let now = ctx.state.clock.epoch_ms();
    match ctx.state.messages.archive_old(days, now) {
        Ok(archived) => Reply::result(request_id, &json!({ "archived": archived })),
        Err(err) => Reply::error(request_id, err.to_string()),
    }
}
