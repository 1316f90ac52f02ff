// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Account identity: names, display metadata, providers.
//!
//! The daemon treats accounts as opaque names; ownership of the full
//! account record (credentials, launch commands) lives outside the core.

use serde::{Deserialize, Serialize};

/// Maximum account name length (first char + 62 more).
const MAX_NAME_LEN: usize = 63;

/// Validate an account name: `^[A-Za-z0-9][A-Za-z0-9_-]{0,62}$`.
pub fn validate_account_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphanumeric() || name.len() > MAX_NAME_LEN {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validate a display color tag: `^#[0-9a-fA-F]{6}$`.
pub fn validate_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// A validated account name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    /// Parse and validate a name. Returns `None` for names that fail the
    /// account name rule.
    pub fn parse(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        validate_account_name(&name).then_some(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for AccountName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Supported agent providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    ClaudeCode,
    CodexCli,
    Openhands,
    GeminiCli,
    Opencode,
    CursorAgent,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::ClaudeCode => "claude-code",
            Provider::CodexCli => "codex-cli",
            Provider::Openhands => "openhands",
            Provider::GeminiCli => "gemini-cli",
            Provider::Opencode => "opencode",
            Provider::CursorAgent => "cursor-agent",
        }
    }
}

#[cfg(test)]
#[path = "account_tests.rs"]
mod tests;
