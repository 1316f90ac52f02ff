// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon → client replies.

use hub_core::{FieldError, HubEvent};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A field-level error detail carried on validation failures.
pub type ErrorDetail = FieldError;

/// Reply from the daemon. Replies echo the request's `requestId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// Authentication accepted.
    #[serde(rename_all = "camelCase")]
    AuthOk {
        account: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Authentication rejected; the connection closes after this reply.
    #[serde(rename_all = "camelCase")]
    AuthFail {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Successful request; payload fields are flattened into the record.
    #[serde(rename_all = "camelCase")]
    Result {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        #[serde(flatten)]
        data: Map<String, Value>,
    },

    /// Failed request. Never tears the connection down.
    #[serde(rename_all = "camelCase")]
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Vec<ErrorDetail>>,
    },

    /// A bus or engine event streamed to a subscriber.
    StreamEvent { event: HubEvent },
}

impl Reply {
    /// A `result` reply from a serializable payload.
    pub fn result<T: Serialize>(request_id: Option<String>, payload: &T) -> Self {
        let data = match serde_json::to_value(payload) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Reply::Result { request_id, data }
    }

    /// An empty `result` acknowledgment.
    pub fn ok(request_id: Option<String>) -> Self {
        Reply::Result { request_id, data: Map::new() }
    }

    pub fn error(request_id: Option<String>, message: impl Into<String>) -> Self {
        Reply::Error { error: message.into(), request_id, details: None }
    }

    pub fn validation_error(
        request_id: Option<String>,
        message: impl Into<String>,
        details: Vec<ErrorDetail>,
    ) -> Self {
        Reply::Error { error: message.into(), request_id, details: Some(details) }
    }
}

#[cfg(test)]
#[path = "reply_tests.rs"]
mod tests;
