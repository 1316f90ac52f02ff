// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outbound seam to account agents.
//!
//! Council and verification runs call members through [`AgentCaller`]; the
//! daemon wires in a transport (provider CLI, HTTP client) from outside
//! the engine crate. Streamed output arrives as [`MemberChunk`]s on a
//! channel while the call is in flight; the call resolves to the final
//! accumulated reply.

use std::time::Duration;

use async_trait::async_trait;
use hub_core::ProviderError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Kind of a streamed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Text,
    Thinking,
    ToolUse,
    ToolResult,
    Error,
}

/// One streamed delta from a member's agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberChunk {
    pub account: String,
    #[serde(rename = "chunkType")]
    pub kind: ChunkKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "toolName")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "toolInput")]
    pub tool_input: Option<Value>,
}

/// A tool call a member made while producing its reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

/// Final result of one member call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberReply {
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Per-call options.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub timeout: Duration,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(180) }
    }
}

/// Transport seam for calling an account's agent.
///
/// Implementations stream deltas on `chunks` as they arrive and resolve to
/// the complete reply. Cancelling `cancel` must abort the underlying call.
#[async_trait]
pub trait AgentCaller: Send + Sync {
    async fn call(
        &self,
        account: &str,
        prompt: &str,
        opts: CallOptions,
        chunks: mpsc::Sender<MemberChunk>,
        cancel: CancellationToken,
    ) -> Result<MemberReply, ProviderError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCaller, ScriptedReply};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use hub_core::ProviderErrorKind;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// A scripted reply for one account call.
    #[derive(Debug, Clone)]
    pub struct ScriptedReply {
        pub content: String,
        pub delay: Duration,
        pub fail: bool,
    }

    impl ScriptedReply {
        pub fn text(content: impl Into<String>) -> Self {
            Self { content: content.into(), delay: Duration::ZERO, fail: false }
        }

        pub fn slow(content: impl Into<String>, delay: Duration) -> Self {
            Self { content: content.into(), delay, fail: false }
        }

        pub fn failure() -> Self {
            Self { content: String::new(), delay: Duration::ZERO, fail: true }
        }
    }

    /// Scripted [`AgentCaller`] for tests: per-account reply queues plus a
    /// log of every prompt seen.
    #[derive(Default)]
    pub struct FakeCaller {
        replies: Mutex<HashMap<String, Vec<ScriptedReply>>>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl FakeCaller {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the next reply for an account (FIFO).
        pub fn push_reply(&self, account: &str, reply: ScriptedReply) {
            self.replies.lock().entry(account.to_string()).or_default().push(reply);
        }

        /// Every `(account, prompt)` pair this caller has served.
        pub fn prompts(&self) -> Vec<(String, String)> {
            self.prompts.lock().clone()
        }

        /// Prompts sent to one account.
        pub fn prompts_for(&self, account: &str) -> Vec<String> {
            self.prompts
                .lock()
                .iter()
                .filter(|(a, _)| a == account)
                .map(|(_, p)| p.clone())
                .collect()
        }
    }

    #[async_trait]
    impl AgentCaller for FakeCaller {
        async fn call(
            &self,
            account: &str,
            prompt: &str,
            _opts: CallOptions,
            chunks: mpsc::Sender<MemberChunk>,
            cancel: CancellationToken,
        ) -> Result<MemberReply, ProviderError> {
            self.prompts.lock().push((account.to_string(), prompt.to_string()));

            let scripted = {
                let mut replies = self.replies.lock();
                let queue = replies.entry(account.to_string()).or_default();
                if queue.is_empty() {
                    ScriptedReply::text(format!("{account} has nothing to add"))
                } else {
                    queue.remove(0)
                }
            };

            if !scripted.delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(scripted.delay) => {}
                    _ = cancel.cancelled() => return Err(ProviderError::aborted()),
                }
            }
            if scripted.fail {
                return Err(ProviderError::new(ProviderErrorKind::Network, "scripted failure"));
            }

            let _ = chunks
                .send(MemberChunk {
                    account: account.to_string(),
                    kind: ChunkKind::Text,
                    content: scripted.content.clone(),
                    tool_name: None,
                    tool_input: None,
                })
                .await;

            Ok(MemberReply { content: scripted.content, tool_calls: Vec::new() })
        }
    }
}
