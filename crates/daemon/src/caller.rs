// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default agent-caller wiring.
//!
//! The daemon does not talk to LLM providers itself; an embedding
//! application registers a real [`AgentCaller`] at startup. Until one is
//! registered, council runs fail fast with a tool error instead of
//! hanging.

use async_trait::async_trait;
use hub_core::{ProviderError, ProviderErrorKind};
use hub_engine::{AgentCaller, CallOptions, MemberChunk, MemberReply};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Placeholder caller used when no agent transport is registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransportCaller;

#[async_trait]
impl AgentCaller for NoTransportCaller {
    async fn call(
        &self,
        account: &str,
        _prompt: &str,
        _opts: CallOptions,
        _chunks: mpsc::Sender<MemberChunk>,
        _cancel: CancellationToken,
    ) -> Result<MemberReply, ProviderError> {
        Err(ProviderError::new(
            ProviderErrorKind::ToolError,
            format!("no agent transport registered for {account}"),
        ))
    }
}
