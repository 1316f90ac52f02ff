// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discussion mode: research → discussion rounds → chairman decision.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::transcript::{format_transcript, TranscriptMessage};
use super::{CouncilConfig, CouncilEngine, CouncilEvent, CouncilResult};

/// Run the discussion pipeline. Always returns a result; failures are
/// carried in `result.error`.
pub(super) async fn run(
    engine: &CouncilEngine,
    config: &CouncilConfig,
    events: &mpsc::UnboundedSender<CouncilEvent>,
    cancel: &CancellationToken,
) -> CouncilResult {
    let mut result = CouncilResult { goal: config.goal.clone(), ..Default::default() };

    if config.members.is_empty() {
        let message = "No members available for council discussion".to_string();
        let _ = events.send(CouncilEvent::Error { message: message.clone() });
        result.error = Some(message);
        return result;
    }

    // ── Research: all members in parallel ────────────────────────────
    let _ = events.send(CouncilEvent::PhaseStart { phase: "research".into() });
    let research_timeout = Duration::from_secs(engine.settings().research_timeout_secs);

    let mut handles = Vec::new();
    for account in &config.members {
        let prompt = research_prompt(&config.goal);
        let account = account.clone();
        let events = events.clone();
        let cancel = cancel.clone();
        handles.push(async move {
            let reply = engine
                .call_member(&account, "research", &prompt, research_timeout, &events, &cancel)
                .await?;
            Some(TranscriptMessage {
                account,
                phase: "research".into(),
                content: reply.content,
                tool_calls: reply.tool_calls,
            })
        });
    }
    let reports = futures_util::future::join_all(handles).await;
    result.research = reports.into_iter().flatten().collect();
    let _ = events.send(CouncilEvent::PhaseComplete { phase: "research".into() });

    if result.research.is_empty() {
        let message = "No members produced research".to_string();
        let _ = events.send(CouncilEvent::Error { message: message.clone() });
        result.error = Some(message);
        return result;
    }
    if cancel.is_cancelled() {
        result.error = Some("aborted".to_string());
        return result;
    }

    // ── Discussion rounds: sequential, deterministic input order ─────
    let discussion_timeout = Duration::from_secs(engine.settings().discussion_timeout_secs);
    for round in 1..=config.rounds {
        let phase = format!("discussion round {round}");
        let _ = events.send(CouncilEvent::PhaseStart { phase: phase.clone() });

        for account in &config.members {
            if cancel.is_cancelled() {
                result.error = Some("aborted".to_string());
                return result;
            }
            let mut messages = result.research.clone();
            messages.extend(result.discussion.iter().cloned());
            let prompt = discussion_prompt(&config.goal, &format_transcript(&messages), round);

            if let Some(reply) = engine
                .call_member(account, &phase, &prompt, discussion_timeout, events, cancel)
                .await
            {
                result.discussion.push(TranscriptMessage {
                    account: account.clone(),
                    phase: phase.clone(),
                    content: reply.content,
                    tool_calls: reply.tool_calls,
                });
            }
        }

        let _ = events.send(CouncilEvent::PhaseComplete { phase });
    }

    // ── Decision: chairman over the (possibly compacted) transcript ──
    let _ = events.send(CouncilEvent::PhaseStart { phase: "decision".into() });
    let decision_timeout = Duration::from_secs(engine.settings().decision_timeout_secs);

    let mut messages = result.research.clone();
    messages.extend(result.discussion.iter().cloned());
    let transcript_text = format_transcript(&messages);
    let transcript_text =
        engine.compact_transcript(&config.chairman, transcript_text, cancel).await;

    let prompt = decision_prompt(&config.goal, &transcript_text);
    result.decision = engine
        .call_member(&config.chairman, "decision", &prompt, decision_timeout, events, cancel)
        .await
        .map(|reply| reply.content);
    let _ = events.send(CouncilEvent::PhaseComplete { phase: "decision".into() });

    if result.decision.is_none() {
        result.error = Some("chairman produced no decision".to_string());
    }
    result
}

fn research_prompt(goal: &str) -> String {
    format!(
        "You are one member of a council analyzing a goal. Research it \
independently and report your findings: relevant files, constraints, risks \
and a sketch of an approach.\n\nGoal: {goal}"
    )
}

fn discussion_prompt(goal: &str, transcript: &str, round: u32) -> String {
    format!(
        "Council discussion, round {round}. Respond to the prior messages: \
agree, disagree, or refine. Be concrete and brief.\n\nGoal: {goal}\n\n\
Transcript so far:\n{transcript}"
    )
}

fn decision_prompt(goal: &str, transcript: &str) -> String {
    format!(
        "You are the council chairman. Read the discussion and produce the \
final decision: the chosen approach, key risks, and concrete next steps.\n\n\
Goal: {goal}\n\nDiscussion:\n{transcript}"
    )
}
