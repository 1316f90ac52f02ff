// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus event record.
//!
//! Events are open records: a well-known `type` tag plus free-form fields.
//! Subscription patterns match on the tag, so the tag stays a string rather
//! than a closed enum and engines can add event kinds without a protocol
//! change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::EventId;

/// Well-known event type tags surfaced to clients.
pub mod kinds {
    pub const ACCOUNT_HEALTH: &str = "ACCOUNT_HEALTH";
    pub const AGENT_STREAM_CHUNK: &str = "AGENT_STREAM_CHUNK";
    pub const COUNCIL_STAGE_START: &str = "COUNCIL_STAGE_START";
    pub const COUNCIL_MEMBER_RESPONSE: &str = "COUNCIL_MEMBER_RESPONSE";
    pub const COUNCIL_STAGE_COMPLETE: &str = "COUNCIL_STAGE_COMPLETE";
    pub const COUNCIL_SESSION_END: &str = "COUNCIL_SESSION_END";
    pub const TASK_VERIFIED: &str = "TASK_VERIFIED";
    pub const MESSAGE_RECEIVED: &str = "MESSAGE_RECEIVED";
    /// Marker queued in place of events dropped from a slow subscriber.
    pub const EVENTS_DROPPED: &str = "EVENTS_DROPPED";
}

/// A single event on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    pub id: EventId,
    /// Emission time, epoch milliseconds.
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl HubEvent {
    /// Build an event with a fresh id. The timestamp is stamped by the bus
    /// at emit time.
    pub fn new(kind: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self { id: EventId::new(), timestamp: 0, kind: kind.into(), fields }
    }

    /// Build an event from a serializable payload struct.
    ///
    /// Non-object payloads produce an event with no extra fields.
    pub fn from_payload<T: Serialize>(kind: impl Into<String>, payload: &T) -> Self {
        let fields = match serde_json::to_value(payload) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self::new(kind, fields)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Returns true when `pattern` matches the event type `kind`.
///
/// A pattern matches if it is equal to the kind, if it is `*`, or if it
/// ends with `*` and the kind starts with the part before the `*`.
pub fn pattern_matches(pattern: &str, kind: &str) -> bool {
    if pattern == "*" || pattern == kind {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => kind.starts_with(prefix),
        None => false,
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
