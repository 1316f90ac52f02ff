// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Council verification: three review stages ending in a signed receipt.
//!
//! Receipts bind a verdict to content hashes of the handoff spec and the
//! evidence bundle. Hashing goes through a canonical JSON form (recursively
//! key-sorted), so identical inputs always produce identical hashes.

use std::sync::Arc;
use std::time::Duration;

use hub_core::config::CouncilSettings;
use hub_core::{Clock, Criticality, HandoffPayload, Reversibility, SystemClock, Verifiability};
use hub_store::ResultCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::council::CouncilEvent;
use crate::member::{AgentCaller, CallOptions, MemberChunk};

/// Review evidence submitted alongside a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_changed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_notes: Option<String>,
}

/// Final verdict over a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "ACCEPT")]
    Accept,
    #[serde(rename = "REJECT")]
    Reject,
    #[serde(rename = "ACCEPT_WITH_NOTES")]
    AcceptWithNotes,
}

/// The durable proof of a verification outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReceipt {
    pub task_id: String,
    pub verifier: String,
    pub verdict: Verdict,
    pub timestamp: u64,
    pub spec_hash: String,
    pub evidence_hash: String,
}

/// One reviewer's stage-1 output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualReview {
    pub account: String,
    pub verdict: Verdict,
    pub confidence: f64,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// One reviewer's stage-2 ranking of the anonymized reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerEvaluation {
    pub account: String,
    pub ranking: Vec<usize>,
    #[serde(default)]
    pub reasoning: String,
}

/// Full verification output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verdict: Verdict,
    pub confidence: f64,
    pub notes: Vec<String>,
    pub receipt: VerificationReceipt,
    pub individual_reviews: Vec<IndividualReview>,
    pub peer_evaluations: Vec<PeerEvaluation>,
    pub chairman_reasoning: String,
}

/// Canonical JSON: objects with recursively sorted keys, no whitespace.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let body: Vec<String> = keys
                .into_iter()
                .map(|key| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(key).unwrap_or_default(),
                        canonical_json(&map[key])
                    )
                })
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Stable hash over `{goal, acceptance_criteria}`.
pub fn compute_spec_hash(goal: &str, acceptance_criteria: &[String]) -> String {
    let value = serde_json::json!({
        "goal": goal,
        "acceptance_criteria": acceptance_criteria,
    });
    sha256_hex(&canonical_json(&value))
}

/// Stable hash over the review bundle.
pub fn compute_evidence_hash(bundle: &ReviewBundle) -> String {
    let value = serde_json::to_value(bundle).unwrap_or(Value::Null);
    sha256_hex(&canonical_json(&value))
}

/// Whether a handoff's verifiability routes it through council review.
pub fn requires_council_verification(verifiability: Option<Verifiability>) -> bool {
    matches!(
        verifiability,
        Some(Verifiability::NeedsReview) | Some(Verifiability::Subjective)
    )
}

/// Cognitive-friction gate: handoffs that may never be auto-accepted.
pub fn requires_human_review(
    criticality: Option<Criticality>,
    reversibility: Option<Reversibility>,
) -> bool {
    match criticality {
        Some(Criticality::Critical) => true,
        Some(Criticality::High) => reversibility == Some(Reversibility::Irreversible),
        _ => false,
    }
}

/// A require-justification action needs a non-empty justification string.
pub fn justification_provided(justification: Option<&str>) -> bool {
    justification.map(|j| !j.trim().is_empty()).unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ReviewReply {
    verdict: Verdict,
    confidence: f64,
    #[serde(default)]
    notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct RankingReply {
    ranking: Vec<usize>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ChairmanReply {
    verdict: Verdict,
    confidence: f64,
    #[serde(default)]
    notes: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

/// Three-stage verification engine.
pub struct VerificationEngine {
    caller: Arc<dyn AgentCaller>,
    settings: CouncilSettings,
    cache: Option<ResultCache>,
    clock: SystemClock,
}

impl VerificationEngine {
    pub fn new(caller: Arc<dyn AgentCaller>, settings: CouncilSettings) -> Self {
        Self { caller, settings, cache: None, clock: SystemClock }
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Run the full review pipeline and produce a receipt.
    pub async fn run(
        &self,
        task_id: &str,
        bundle: &ReviewBundle,
        handoff: &HandoffPayload,
        members: &[String],
        chairman: &str,
        events: &mpsc::UnboundedSender<CouncilEvent>,
        cancel: &CancellationToken,
    ) -> VerificationResult {
        let spec_hash = compute_spec_hash(&handoff.goal, &handoff.acceptance_criteria);
        let evidence_hash = compute_evidence_hash(bundle);

        // ── Stage 1: independent reviews, parallel ───────────────────
        let _ = events.send(CouncilEvent::PhaseStart { phase: "review".into() });
        let timeout = Duration::from_secs(self.settings.research_timeout_secs);
        let mut handles = Vec::new();
        for account in members {
            let prompt = review_prompt(handoff, bundle);
            let account = account.clone();
            let cancel = cancel.clone();
            handles.push(async move {
                let content = self.call(&account, &prompt, timeout, &cancel).await?;
                let reply = parse_reply::<ReviewReply>(&content)?;
                Some(IndividualReview {
                    account,
                    verdict: reply.verdict,
                    confidence: reply.confidence.clamp(0.0, 1.0),
                    notes: reply.notes,
                })
            });
        }
        let individual_reviews: Vec<IndividualReview> =
            futures_util::future::join_all(handles).await.into_iter().flatten().collect();
        let _ = events.send(CouncilEvent::PhaseComplete { phase: "review".into() });

        if individual_reviews.is_empty() {
            let receipt = self.receipt(task_id, Verdict::Reject, spec_hash, evidence_hash);
            let result = VerificationResult {
                verdict: Verdict::Reject,
                confidence: 0.0,
                notes: vec!["all accounts failed".to_string()],
                receipt,
                individual_reviews: Vec::new(),
                peer_evaluations: Vec::new(),
                chairman_reasoning: String::new(),
            };
            let _ = events.send(CouncilEvent::Error {
                message: "all accounts failed to produce a review".to_string(),
            });
            return self.persist(result);
        }

        // ── Stage 2: anonymized peer evaluation, parallel ────────────
        let _ = events.send(CouncilEvent::PhaseStart { phase: "evaluation".into() });
        let anonymized = anonymize_reviews(&individual_reviews);
        let eval_timeout = Duration::from_secs(self.settings.discussion_timeout_secs);
        let mut handles = Vec::new();
        for account in members {
            let prompt = evaluation_prompt(&anonymized, individual_reviews.len());
            let account = account.clone();
            let cancel = cancel.clone();
            handles.push(async move {
                let content = self.call(&account, &prompt, eval_timeout, &cancel).await?;
                let reply = parse_reply::<RankingReply>(&content)?;
                Some(PeerEvaluation { account, ranking: reply.ranking, reasoning: reply.reasoning })
            });
        }
        let peer_evaluations: Vec<PeerEvaluation> =
            futures_util::future::join_all(handles).await.into_iter().flatten().collect();
        let _ = events.send(CouncilEvent::PhaseComplete { phase: "evaluation".into() });

        // ── Stage 3: chairman verdict ────────────────────────────────
        let _ = events.send(CouncilEvent::PhaseStart { phase: "verdict".into() });
        let verdict_timeout = Duration::from_secs(self.settings.decision_timeout_secs);
        let prompt = verdict_prompt(handoff, &anonymized, &peer_evaluations);
        let chairman_reply = match self.call(chairman, &prompt, verdict_timeout, cancel).await {
            Some(content) => parse_reply::<ChairmanReply>(&content),
            None => None,
        };
        let _ = events.send(CouncilEvent::PhaseComplete { phase: "verdict".into() });

        let (verdict, confidence, notes, reasoning) = match chairman_reply {
            Some(reply) => (reply.verdict, reply.confidence.clamp(0.0, 1.0), reply.notes, reply.reasoning),
            // Chairman failure: fall back to the majority of stage-1 verdicts.
            None => {
                let rejects = individual_reviews
                    .iter()
                    .filter(|review| review.verdict == Verdict::Reject)
                    .count();
                let verdict = if rejects * 2 >= individual_reviews.len() {
                    Verdict::Reject
                } else {
                    Verdict::AcceptWithNotes
                };
                (
                    verdict,
                    0.5,
                    vec!["chairman unavailable, majority verdict".to_string()],
                    String::new(),
                )
            }
        };

        let receipt = self.receipt(task_id, verdict, spec_hash, evidence_hash);
        self.persist(VerificationResult {
            verdict,
            confidence,
            notes,
            receipt,
            individual_reviews,
            peer_evaluations,
            chairman_reasoning: reasoning,
        })
    }

    fn receipt(
        &self,
        task_id: &str,
        verdict: Verdict,
        spec_hash: String,
        evidence_hash: String,
    ) -> VerificationReceipt {
        VerificationReceipt {
            task_id: task_id.to_string(),
            verifier: "council".to_string(),
            verdict,
            timestamp: self.clock.epoch_ms(),
            spec_hash,
            evidence_hash,
        }
    }

    fn persist(&self, result: VerificationResult) -> VerificationResult {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.append(&result) {
                warn!(error = %err, "failed to append verification result to cache");
            }
        }
        result
    }

    async fn call(
        &self,
        account: &str,
        prompt: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Option<String> {
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<MemberChunk>(64);
        let drain = tokio::spawn(async move { while chunk_rx.recv().await.is_some() {} });
        let call = self.caller.call(
            account,
            prompt,
            CallOptions { timeout },
            chunk_tx,
            cancel.child_token(),
        );
        let outcome = tokio::select! {
            result = tokio::time::timeout(timeout, call) => match result {
                Ok(Ok(reply)) => Some(reply.content),
                _ => None,
            },
            _ = cancel.cancelled() => None,
        };
        let _ = drain.await;
        outcome
    }
}

fn parse_reply<T: serde::de::DeserializeOwned>(content: &str) -> Option<T> {
    if let Ok(parsed) = serde_json::from_str::<T>(content.trim()) {
        return Some(parsed);
    }
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<T>(&content[start..=end]).ok()
}

fn review_label(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// Render reviews with `Review A/B/…` labels, account names stripped.
fn anonymize_reviews(reviews: &[IndividualReview]) -> String {
    let mut out = String::new();
    for (index, review) in reviews.iter().enumerate() {
        let body = serde_json::json!({
            "verdict": review.verdict,
            "confidence": review.confidence,
            "notes": review.notes,
        });
        out.push_str(&format!("Review {}:\n{}\n\n", review_label(index), body));
    }
    out
}

fn review_prompt(handoff: &HandoffPayload, bundle: &ReviewBundle) -> String {
    let bundle_json = serde_json::to_string_pretty(bundle).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Review this completed task against its acceptance criteria. Reply \
with STRICT JSON only: {{\"verdict\": \"ACCEPT\"|\"REJECT\"|\
\"ACCEPT_WITH_NOTES\", \"confidence\": 0..1, \"notes\": [string]}}.\n\n\
Goal: {}\nAcceptance criteria:\n- {}\n\nEvidence:\n{}",
        handoff.goal,
        handoff.acceptance_criteria.join("\n- "),
        bundle_json,
    )
}

fn evaluation_prompt(anonymized: &str, count: usize) -> String {
    format!(
        "Several reviews of the same task follow, labeled Review A through \
Review {}. Rank them by rigor, best first. Reply with STRICT JSON only: \
{{\"ranking\": [1-based review numbers], \"reasoning\": string}}.\n\n{}",
        review_label(count.saturating_sub(1)),
        anonymized,
    )
}

fn verdict_prompt(
    handoff: &HandoffPayload,
    anonymized: &str,
    evaluations: &[PeerEvaluation],
) -> String {
    let rankings: Vec<&Vec<usize>> = evaluations.iter().map(|e| &e.ranking).collect();
    format!(
        "You are the verification chairman. Weigh the reviews and their peer \
rankings, then issue the final verdict. Reply with STRICT JSON only: \
{{\"verdict\": \"ACCEPT\"|\"REJECT\"|\"ACCEPT_WITH_NOTES\", \"confidence\": \
0..1, \"notes\": [string], \"reasoning\": string}}.\n\nGoal: {}\n\n{}\n\
Peer rankings: {:?}",
        handoff.goal, anonymized, rankings,
    )
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
