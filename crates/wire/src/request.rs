// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client → daemon requests.

use std::collections::HashMap;

use hub_core::HandoffPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed inbound record: optional request id plus the typed request.
///
/// Dynamic JSON comes off the socket; decoding into this envelope rejects
/// unknown `type` values at the serde layer, which the dispatcher reports
/// as a non-fatal error reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub request: Request,
}

/// Request from an account client to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// First record on every connection.
    Auth { account: String, token: String },

    /// Liveness check.
    Ping,

    /// Queue a message for another account.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        to: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<HashMap<String, String>>,
    },

    /// Read the inbox. Without paging returns unread and marks them read;
    /// with paging returns a page including read messages.
    ReadMessages {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<u32>,
    },

    /// Hand a task off to another account.
    HandoffTask {
        to: String,
        payload: HandoffPayload,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<HashMap<String, String>>,
    },

    /// Drive a task through its status lifecycle.
    #[serde(rename_all = "camelCase")]
    UpdateTaskStatus {
        task_id: String,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Report progress on an in-progress task.
    #[serde(rename_all = "camelCase")]
    ReportProgress { task_id: String, percent: f64 },

    /// Run council verification over a submitted task.
    #[serde(rename_all = "camelCase")]
    VerifyTask {
        task_id: String,
        #[serde(default)]
        bundle: Value,
        members: Vec<String>,
        chairman: String,
    },

    /// Add event subscriptions for this connection. `replay` asks for up
    /// to that many recent matching events from the ring first.
    Subscribe {
        patterns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replay: Option<u32>,
    },

    /// Remove event subscriptions for this connection.
    Unsubscribe { patterns: Vec<String> },

    /// Run a council analysis (three-stage ranking).
    CouncilAnalyze { goal: String, members: Vec<String>, chairman: String },

    /// Run a council discussion (research → rounds → decision).
    CouncilDiscussion {
        goal: String,
        members: Vec<String>,
        chairman: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rounds: Option<u32>,
    },

    /// Open a shared session with another account.
    ShareSession { participant: String, workspace: String },

    /// Join a session as the declared participant.
    #[serde(rename_all = "camelCase")]
    JoinSession { session_id: String },

    /// Broadcast an update into a session.
    #[serde(rename_all = "camelCase")]
    SessionBroadcast { session_id: String, data: Value },

    /// Liveness ping for a session.
    #[serde(rename_all = "camelCase")]
    SessionPing { session_id: String },

    /// Session metadata.
    #[serde(rename_all = "camelCase")]
    SessionStatus { session_id: String },

    /// Updates past this account's read cursor.
    #[serde(rename_all = "camelCase")]
    SessionHistory { session_id: String },

    /// Leave (end) a session.
    #[serde(rename_all = "camelCase")]
    LeaveSession { session_id: String },

    /// Names of currently connected accounts.
    ListAccounts,

    /// Archive old read messages.
    ArchiveMessages { days: u32 },

    /// Health snapshot for all known accounts.
    GetHealth,

    /// Reputation record for one account (defaults to the caller).
    GetReputation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        account: Option<String>,
    },

    /// Ask the daemon to shut down.
    Shutdown,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
