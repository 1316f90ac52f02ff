// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inter-account messages and handoff envelopes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::MessageId;

/// What a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Free-form text between accounts.
    Message,
    /// A structured task handoff; `content` holds the JSON payload.
    Handoff,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Message => "message",
            MessageKind::Handoff => "handoff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(MessageKind::Message),
            "handoff" => Some(MessageKind::Handoff),
            _ => None,
        }
    }
}

/// A durable inbox entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub from: String,
    pub to: String,
    pub kind: MessageKind,
    pub content: String,
    /// Epoch milliseconds at send time.
    pub timestamp: u64,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, String>>,
}

impl Message {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        kind: MessageKind,
        content: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            // Message ids are uuids, unlike the short nanoid ids elsewhere:
            // they end up in other systems' logs and must never collide.
            id: MessageId::from_string(format!("msg-{}", uuid::Uuid::new_v4())),
            from: from.into(),
            to: to.into(),
            kind,
            content: content.into(),
            timestamp,
            read: false,
            context: None,
        }
    }

    pub fn with_context(mut self, context: HashMap<String, String>) -> Self {
        self.context = Some(context);
        self
    }
}
