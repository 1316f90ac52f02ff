// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Council deliberation engine.
//!
//! Two modes over the same machinery: *discussion* (research → N rounds →
//! chairman decision) and *analysis* (per-member analysis → anonymized
//! peer ranking → chairman consensus). Members run in parallel within a
//! phase; discussion rounds go member by member in input order. Every
//! member call streams chunks that are forwarded as engine events.

mod analysis;
mod discussion;
pub mod transcript;

pub use analysis::{
    aggregate_rank, AnalysisResult, ConsensusAnalysis, MemberAnalysis, PeerRanking,
};
pub use transcript::{TranscriptMessage, COMPACTION_PROMPT};

use std::sync::Arc;

use hub_core::config::CouncilSettings;
use hub_core::{Clock, SystemClock};
use hub_store::ResultCache;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::member::{AgentCaller, CallOptions, MemberChunk};

/// Parameters for one council run.
#[derive(Debug, Clone)]
pub struct CouncilConfig {
    pub goal: String,
    pub members: Vec<String>,
    pub chairman: String,
    pub rounds: u32,
}

/// A streamed chunk event, enriched with the account it came from.
pub type MemberChunkEvent = MemberChunk;

/// Engine events, fanned out to subscribers by the connection server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CouncilEvent {
    PhaseStart { phase: String },
    MemberStart { account: String, phase: String },
    MemberChunk { chunk: MemberChunkEvent },
    MemberDone { account: String, phase: String },
    PhaseComplete { phase: String },
    Error { message: String },
    Done { result: Box<CouncilResult> },
}

/// Final output of a discussion run. Analysis runs produce
/// [`AnalysisResult`] inside `analysis`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CouncilResult {
    pub goal: String,
    #[serde(default)]
    pub research: Vec<TranscriptMessage>,
    #[serde(default)]
    pub discussion: Vec<TranscriptMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Council engine: drives deliberation runs through an [`AgentCaller`].
pub struct CouncilEngine {
    caller: Arc<dyn AgentCaller>,
    settings: CouncilSettings,
    cache: Option<ResultCache>,
    clock: SystemClock,
}

impl CouncilEngine {
    pub fn new(caller: Arc<dyn AgentCaller>, settings: CouncilSettings) -> Self {
        Self { caller, settings, cache: None, clock: SystemClock }
    }

    /// Persist completed runs to a cache file.
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(&self) -> &CouncilSettings {
        &self.settings
    }

    /// Run a full discussion: research → rounds → decision.
    pub async fn run_discussion(
        &self,
        config: CouncilConfig,
        events: mpsc::UnboundedSender<CouncilEvent>,
        cancel: CancellationToken,
    ) -> CouncilResult {
        let result = discussion::run(self, &config, &events, &cancel).await;
        self.finish(result, &events)
    }

    /// Run a three-stage analysis with anonymized peer review.
    pub async fn run_analysis(
        &self,
        config: CouncilConfig,
        events: mpsc::UnboundedSender<CouncilEvent>,
        cancel: CancellationToken,
    ) -> CouncilResult {
        let result = analysis::run(self, &config, &events, &cancel).await;
        self.finish(result, &events)
    }

    fn finish(
        &self,
        mut result: CouncilResult,
        events: &mpsc::UnboundedSender<CouncilEvent>,
    ) -> CouncilResult {
        result.timestamp = self.clock.epoch_ms();
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.append(&result) {
                warn!(error = %err, "failed to append council result to cache");
            }
        }
        let _ = events.send(CouncilEvent::Done { result: Box::new(result.clone()) });
        result
    }

    /// Call one member with a timeout, forwarding streamed chunks as
    /// events. Returns the reply with bounded content, or `None` when the
    /// member timed out, failed, or the run was cancelled; the caller
    /// proceeds without it.
    pub(crate) async fn call_member(
        &self,
        account: &str,
        phase: &str,
        prompt: &str,
        timeout: std::time::Duration,
        events: &mpsc::UnboundedSender<CouncilEvent>,
        cancel: &CancellationToken,
    ) -> Option<crate::member::MemberReply> {
        let _ = events.send(CouncilEvent::MemberStart {
            account: account.to_string(),
            phase: phase.to_string(),
        });

        let (chunk_tx, mut chunk_rx) = mpsc::channel::<MemberChunk>(64);
        let forward_events = events.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                let _ = forward_events.send(CouncilEvent::MemberChunk { chunk });
            }
        });

        let call_cancel = cancel.child_token();
        let call = self.caller.call(
            account,
            prompt,
            CallOptions { timeout },
            chunk_tx,
            call_cancel.clone(),
        );

        let outcome = tokio::select! {
            result = tokio::time::timeout(timeout, call) => match result {
                Ok(Ok(reply)) => Some(reply),
                Ok(Err(err)) => {
                    debug!(account, phase, error = %err, "member call failed");
                    None
                }
                Err(_) => {
                    debug!(account, phase, "member call timed out");
                    call_cancel.cancel();
                    None
                }
            },
            _ = cancel.cancelled() => {
                call_cancel.cancel();
                None
            }
        };

        // The chunk sender is dropped with the call; let the forwarder drain.
        let _ = forwarder.await;

        let _ = events.send(CouncilEvent::MemberDone {
            account: account.to_string(),
            phase: phase.to_string(),
        });

        outcome.map(|mut reply| {
            reply.content = transcript::bound_member_output(&reply.content);
            reply
        })
    }

    /// Compact a transcript for the chairman when it is over the size
    /// threshold. Falls back to the raw transcript if summarization fails.
    pub(crate) async fn compact_transcript(
        &self,
        chairman: &str,
        transcript_text: String,
        cancel: &CancellationToken,
    ) -> String {
        if !transcript::needs_compaction(&transcript_text) {
            return transcript_text;
        }

        let prompt = format!("{COMPACTION_PROMPT}\n\n{transcript_text}");
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<MemberChunk>(64);
        let drain = tokio::spawn(async move { while chunk_rx.recv().await.is_some() {} });

        let timeout = std::time::Duration::from_secs(self.settings.decision_timeout_secs);
        let call = self.caller.call(
            chairman,
            &prompt,
            CallOptions { timeout },
            chunk_tx,
            cancel.child_token(),
        );

        let summary = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(reply)) if !reply.content.trim().is_empty() => Some(reply.content),
            Ok(Ok(_)) | Ok(Err(_)) | Err(_) => None,
        };
        let _ = drain.await;

        match summary {
            Some(summary) => summary,
            None => {
                warn!("transcript compaction failed, falling back to raw transcript");
                transcript_text
            }
        }
    }
}

#[cfg(test)]
#[path = "council_tests.rs"]
mod tests;
