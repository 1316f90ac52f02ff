// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Analysis mode: strict-JSON member analyses, anonymized peer ranking,
//! chairman consensus.
//!
//! Stage-2 prompts label analyses `Analysis A`, `Analysis B`, … and never
//! contain account names, so rankings cannot be biased by reputation.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{CouncilConfig, CouncilEngine, CouncilEvent, CouncilResult};

/// Stage-1 output: one member's structured analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAnalysis {
    pub complexity: String,
    pub estimated_duration_minutes: u64,
    pub required_skills: Vec<String>,
    pub recommended_approach: String,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_provider: Option<String>,
}

/// Stage-2 output: one reviewer's ranking of the anonymized analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRanking {
    /// 1-based indices into the anonymized analysis list, best first.
    pub ranking: Vec<usize>,
    #[serde(default)]
    pub reasoning: String,
}

/// Stage-3 output: the chairman's synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusAnalysis {
    pub consensus_complexity: String,
    pub consensus_duration_minutes: u64,
    pub consensus_skills: Vec<String>,
    pub recommended_approach: String,
    /// Chairman's confidence in the consensus, 0 to 1.
    pub confidence: f64,
    #[serde(
        default,
        rename = "dissenting_views",
        skip_serializing_if = "Option::is_none"
    )]
    pub dissenting_views: Option<String>,
}

/// Full analysis-mode output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub analyses: Vec<(String, MemberAnalysis)>,
    pub rankings: Vec<(String, PeerRanking)>,
    /// `(account, average 1-based rank)`, best (lowest) first.
    pub aggregate_rank: Vec<(String, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus: Option<ConsensusAnalysis>,
}

/// Average each account's 1-based position across peer rankings.
///
/// `rankings` entries index into `accounts` (1-based). Out-of-range
/// indices are ignored. The output is sorted ascending (a lower average
/// rank is better) and is invariant under reviewer permutation.
pub fn aggregate_rank(accounts: &[String], rankings: &[PeerRanking]) -> Vec<(String, f64)> {
    let mut positions: HashMap<usize, Vec<f64>> = HashMap::new();
    for ranking in rankings {
        for (position, &index) in ranking.ranking.iter().enumerate() {
            if index >= 1 && index <= accounts.len() {
                positions.entry(index - 1).or_default().push((position + 1) as f64);
            }
        }
    }

    let mut averaged: Vec<(String, f64)> = positions
        .into_iter()
        .map(|(account_index, ranks)| {
            let avg = ranks.iter().sum::<f64>() / ranks.len() as f64;
            (accounts[account_index].clone(), avg)
        })
        .collect();
    averaged.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
    averaged
}

/// Extract the first JSON object from a member reply that may wrap it in
/// prose or a code fence.
pub(super) fn parse_json_reply<T: serde::de::DeserializeOwned>(content: &str) -> Option<T> {
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

fn label(index: usize) -> String {
    // A, B, …, Z, AA, AB, … for absurdly large councils.
    let mut index = index;
    let mut out = String::new();
    loop {
        out.insert(0, (b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    out
}

pub(super) async fn run(
    engine: &CouncilEngine,
    config: &CouncilConfig,
    events: &mpsc::UnboundedSender<CouncilEvent>,
    cancel: &CancellationToken,
) -> CouncilResult {
    let mut result = CouncilResult { goal: config.goal.clone(), ..Default::default() };

    if config.members.is_empty() {
        let message = "No members available for council analysis".to_string();
        let _ = events.send(CouncilEvent::Error { message: message.clone() });
        result.error = Some(message);
        return result;
    }

    let stage_timeout = Duration::from_secs(engine.settings().research_timeout_secs);

    // ── Stage 1: independent analyses, parallel ──────────────────────
    let _ = events.send(CouncilEvent::PhaseStart { phase: "analysis".into() });
    let mut handles = Vec::new();
    for account in &config.members {
        let prompt = analysis_prompt(&config.goal);
        let account = account.clone();
        let events = events.clone();
        let cancel = cancel.clone();
        handles.push(async move {
            let reply = engine
                .call_member(&account, "analysis", &prompt, stage_timeout, &events, &cancel)
                .await?;
            let analysis = parse_json_reply::<MemberAnalysis>(&reply.content)?;
            Some((account, analysis))
        });
    }
    let analyses: Vec<(String, MemberAnalysis)> =
        futures_util::future::join_all(handles).await.into_iter().flatten().collect();
    let _ = events.send(CouncilEvent::PhaseComplete { phase: "analysis".into() });

    if analyses.is_empty() {
        let message = "No members produced an analysis".to_string();
        let _ = events.send(CouncilEvent::Error { message: message.clone() });
        result.error = Some(message);
        return result;
    }
    if cancel.is_cancelled() {
        result.error = Some("aborted".to_string());
        return result;
    }

    // ── Stage 2: anonymized peer ranking, parallel ───────────────────
    let _ = events.send(CouncilEvent::PhaseStart { phase: "ranking".into() });
    let ranked_accounts: Vec<String> =
        analyses.iter().map(|(account, _)| account.clone()).collect();
    let anonymized = anonymize(&analyses);

    let ranking_timeout = Duration::from_secs(engine.settings().discussion_timeout_secs);
    let mut handles = Vec::new();
    for account in &config.members {
        let prompt = ranking_prompt(&config.goal, &anonymized, analyses.len());
        let account = account.clone();
        let events = events.clone();
        let cancel = cancel.clone();
        handles.push(async move {
            let reply = engine
                .call_member(&account, "ranking", &prompt, ranking_timeout, &events, &cancel)
                .await?;
            let ranking = parse_json_reply::<PeerRanking>(&reply.content)?;
            Some((account, ranking))
        });
    }
    let rankings: Vec<(String, PeerRanking)> =
        futures_util::future::join_all(handles).await.into_iter().flatten().collect();
    let _ = events.send(CouncilEvent::PhaseComplete { phase: "ranking".into() });

    let peer_rankings: Vec<PeerRanking> =
        rankings.iter().map(|(_, ranking)| ranking.clone()).collect();
    let aggregate = aggregate_rank(&ranked_accounts, &peer_rankings);

    // ── Stage 3: chairman consensus ──────────────────────────────────
    let _ = events.send(CouncilEvent::PhaseStart { phase: "consensus".into() });
    let decision_timeout = Duration::from_secs(engine.settings().decision_timeout_secs);
    let prompt = consensus_prompt(&config.goal, &anonymized, &peer_rankings);
    let consensus = match engine
        .call_member(&config.chairman, "consensus", &prompt, decision_timeout, events, cancel)
        .await
    {
        Some(reply) => parse_json_reply::<ConsensusAnalysis>(&reply.content),
        None => None,
    };
    let _ = events.send(CouncilEvent::PhaseComplete { phase: "consensus".into() });

    if consensus.is_none() {
        result.error = Some("chairman produced no consensus".to_string());
    }
    result.analysis = Some(AnalysisResult {
        analyses,
        rankings,
        aggregate_rank: aggregate,
        consensus,
    });
    result
}

/// Render analyses with `Analysis A/B/…` labels and no account names.
fn anonymize(analyses: &[(String, MemberAnalysis)]) -> String {
    let mut out = String::new();
    for (index, (_, analysis)) in analyses.iter().enumerate() {
        let body = serde_json::to_string_pretty(analysis)
            .unwrap_or_else(|_| "{}".to_string());
        out.push_str(&format!("Analysis {}:\n{}\n\n", label(index), body));
    }
    out
}

fn analysis_prompt(goal: &str) -> String {
    format!(
        "Analyze this goal and reply with STRICT JSON only, no prose, with \
keys: complexity (trivial|simple|moderate|complex|epic), \
estimatedDurationMinutes (integer), requiredSkills (string array), \
recommendedApproach (string), risks (string array), suggestedProvider \
(string, optional).\n\nGoal: {goal}"
    )
}

fn ranking_prompt(goal: &str, anonymized: &str, count: usize) -> String {
    format!(
        "Several analyses of the same goal follow, labeled Analysis A \
through Analysis {}. Rank them from best to worst. Reply with STRICT JSON \
only: {{\"ranking\": [1-based analysis numbers, best first], \
\"reasoning\": string}}.\n\nGoal: {goal}\n\n{anonymized}",
        label(count.saturating_sub(1)),
    )
}

fn consensus_prompt(goal: &str, anonymized: &str, rankings: &[PeerRanking]) -> String {
    let rankings_json =
        serde_json::to_string(rankings).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You are the council chairman. Synthesize the analyses and peer \
rankings below into a consensus. Reply with STRICT JSON only, keys: \
consensusComplexity, consensusDurationMinutes, consensusSkills, \
recommendedApproach, confidence (0..1), dissenting_views (optional).\n\n\
Goal: {goal}\n\n{anonymized}\nPeer rankings: {rankings_json}"
    )
}

#[cfg(test)]
#[path = "analysis_tests.rs"]
mod tests;
