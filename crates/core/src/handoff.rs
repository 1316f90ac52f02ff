// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff payloads and their validation gates.
//!
//! Validation runs in two passes: structural (required fields present and
//! non-empty) and sanitization (shell-injection patterns in run commands,
//! path traversal in context paths, control characters). Any block-severity
//! match rejects the payload; prompt-override patterns in the goal and
//! acceptance criteria only warn.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reversibility {
    Reversible,
    Irreversible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verifiability {
    AutoTestable,
    NeedsReview,
    Subjective,
}

/// The structured body of a `kind = handoff` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffPayload {
    pub goal: String,
    pub acceptance_criteria: Vec<String>,
    pub run_commands: Vec<String>,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criticality: Option<Criticality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reversibility: Option<Reversibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifiability: Option<Verifiability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation_depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_handoff_id: Option<String>,
}

impl HandoffPayload {
    /// Fill defaulted fields: an empty `blocked_by` becomes `["none"]`.
    pub fn normalize(&mut self) {
        if self.blocked_by.is_empty() {
            self.blocked_by = vec!["none".to_string()];
        }
    }
}

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

fn field_error(field: &str, message: impl Into<String>) -> FieldError {
    FieldError { field: field.to_string(), message: message.into() }
}

/// Structural validation: required fields non-empty, list entries non-blank.
///
/// Call [`HandoffPayload::normalize`] first so `blocked_by` defaulting has
/// happened. Returns all failures, not just the first.
pub fn validate_handoff(payload: &HandoffPayload) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if payload.goal.trim().is_empty() {
        errors.push(field_error("goal", "goal must be a non-empty string"));
    }
    for (field, list) in [
        ("acceptance_criteria", &payload.acceptance_criteria),
        ("run_commands", &payload.run_commands),
        ("blocked_by", &payload.blocked_by),
    ] {
        if list.is_empty() {
            errors.push(field_error(field, "list must have at least one entry"));
        } else if list.iter().any(|entry| entry.trim().is_empty()) {
            errors.push(field_error(field, "list entries must be non-empty"));
        }
    }
    if let Some(parent) = &payload.parent_handoff_id {
        if parent.trim().is_empty() {
            errors.push(field_error("parent_handoff_id", "must be non-empty when present"));
        }
    }

    errors
}

/// Substrings in run commands that indicate shell-injection attempts.
const SHELL_INJECTION_PATTERNS: &[&str] =
    &["$(", "`", "&&", "||", ";", "|", ">", "<", "\n", "rm -rf /"];

/// Substrings in goals/criteria that look like prompt-override attempts.
const PROMPT_OVERRIDE_PATTERNS: &[&str] = &[
    "ignore previous instructions",
    "ignore all previous",
    "disregard your instructions",
    "you are now",
    "system prompt",
];

/// Outcome of the sanitization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SanitizeReport {
    /// Block-severity findings; any entry rejects the payload.
    pub blocks: Vec<FieldError>,
    /// Warn-severity findings; surfaced but non-fatal.
    pub warnings: Vec<FieldError>,
}

impl SanitizeReport {
    pub fn is_blocked(&self) -> bool {
        !self.blocks.is_empty()
    }
}

fn has_control_chars(s: &str) -> bool {
    s.chars().any(|c| c.is_control() && c != '\n' && c != '\t')
}

fn has_path_traversal(s: &str) -> bool {
    s.contains("..") || s.contains('\0') || s.starts_with("~root")
}

/// Sanitize a payload plus its optional request context.
pub fn sanitize_handoff(
    payload: &HandoffPayload,
    context: Option<&HashMap<String, String>>,
) -> SanitizeReport {
    let mut report = SanitizeReport::default();

    for command in &payload.run_commands {
        if let Some(pattern) =
            SHELL_INJECTION_PATTERNS.iter().find(|pattern| command.contains(**pattern))
        {
            report.blocks.push(field_error(
                "run_commands",
                format!("shell metacharacter {:?} not allowed in run commands", pattern),
            ));
        }
        if has_control_chars(command) {
            report.blocks.push(field_error("run_commands", "control characters not allowed"));
        }
    }

    if let Some(context) = context {
        for key in ["projectDir", "branch"] {
            if let Some(value) = context.get(key) {
                if has_path_traversal(value) {
                    report.blocks.push(field_error(
                        key,
                        format!("path traversal pattern in context.{key}"),
                    ));
                }
                if has_control_chars(value) {
                    report
                        .blocks
                        .push(field_error(key, format!("control characters in context.{key}")));
                }
            }
        }
    }

    let goal_lower = payload.goal.to_lowercase();
    let mut texts: Vec<(&str, String)> = vec![("goal", goal_lower)];
    for criterion in &payload.acceptance_criteria {
        texts.push(("acceptance_criteria", criterion.to_lowercase()));
    }
    for &(field, ref text) in &texts {
        if let Some(pattern) =
            PROMPT_OVERRIDE_PATTERNS.iter().find(|pattern| text.contains(**pattern))
        {
            report
                .warnings
                .push(field_error(field, format!("prompt-override pattern {pattern:?}")));
        }
    }

    report
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
