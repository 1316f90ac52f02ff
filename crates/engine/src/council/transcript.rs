// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded accumulation and transcript formatting for council runs.
//!
//! Truncation keeps the head and tail of long content: decisions need both
//! the opening framing and the final conclusions, so the middle is what
//! gets dropped.

use serde::{Deserialize, Serialize};

use crate::member::ToolCallRecord;

/// Cap on a member's accumulated streamed output.
pub const STREAM_MAX_CHARS: usize = 4000;
const STREAM_HEAD: usize = 3500;
const STREAM_TAIL: usize = 500;

/// Cap on a research message re-formatted into later transcripts.
pub const RESEARCH_MAX_CHARS: usize = 2000;
const RESEARCH_TAIL: usize = 400;

/// Cap on a discussion message in a transcript (head only).
pub const DISCUSSION_MAX_CHARS: usize = 800;

/// Transcripts beyond this byte size are summarized for the chairman.
pub const COMPACTION_THRESHOLD_BYTES: usize = 20 * 1024;

/// Fixed summarization prompt for transcript compaction.
pub const COMPACTION_PROMPT: &str = "Summarize the council discussion below for the chairman's \
final decision. Preserve: key findings with specific file paths and line numbers; areas of \
agreement and disagreement; concrete recommendations; caveats or risks. Use sections: Key \
Findings, Consensus, Disagreements, Recommendations.";

/// One message in a council transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub account: String,
    /// "research" or "discussion round N".
    pub phase: String,
    pub content: String,
    /// Tool calls the member made while producing this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
}

impl TranscriptMessage {
    pub fn new(account: impl Into<String>, phase: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            phase: phase.into(),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

fn char_boundary_floor(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn char_boundary_ceil(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Keep the first `head` and last `tail` characters of `content` when it
/// exceeds `max`, with an omission marker in between.
pub fn truncate_head_tail(content: &str, max: usize, head: usize, tail: usize) -> String {
    if content.len() <= max {
        return content.to_string();
    }
    let head_end = char_boundary_floor(content, head);
    let tail_start = char_boundary_ceil(content, content.len().saturating_sub(tail));
    let omitted = tail_start - head_end;
    format!(
        "{}\n…{} chars omitted…\n{}",
        &content[..head_end],
        omitted,
        &content[tail_start..]
    )
}

/// Head-only truncation with an omission marker.
pub fn truncate_head(content: &str, max: usize) -> String {
    if content.len() <= max {
        return content.to_string();
    }
    let head_end = char_boundary_floor(content, max);
    let omitted = content.len() - head_end;
    format!("{}\n…{} chars omitted…", &content[..head_end], omitted)
}

/// Bound a member's full streamed output.
pub fn bound_member_output(content: &str) -> String {
    truncate_head_tail(content, STREAM_MAX_CHARS, STREAM_HEAD, STREAM_TAIL)
}

/// Format accumulated messages for inclusion in a member prompt.
///
/// Research entries are head+tail bounded; discussion entries head-only.
pub fn format_transcript(messages: &[TranscriptMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let body = if message.phase == "research" {
            truncate_head_tail(
                &message.content,
                RESEARCH_MAX_CHARS,
                RESEARCH_MAX_CHARS - RESEARCH_TAIL,
                RESEARCH_TAIL,
            )
        } else {
            truncate_head(&message.content, DISCUSSION_MAX_CHARS)
        };
        out.push_str(&format!("[{} / {}]\n{}\n\n", message.account, message.phase, body));
    }
    out
}

/// Whether a formatted transcript needs compaction before the chairman
/// sees it.
pub fn needs_compaction(transcript: &str) -> bool {
    transcript.len() > COMPACTION_THRESHOLD_BYTES
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
