// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token authentication for socket connections.
//!
//! One shared secret per account, stored as `<tokens_dir>/<name>.token`
//! with mode 0600. Verification is constant time and never tells the
//! caller whether the file was missing, unreadable, or simply wrong.

use std::path::PathBuf;

use hub_core::validate_account_name;
use tracing::debug;

/// Per-account shared-secret lookup from a directory of token files.
#[derive(Debug, Clone)]
pub struct TokenStore {
    tokens_dir: PathBuf,
}

impl TokenStore {
    pub fn new(tokens_dir: impl Into<PathBuf>) -> Self {
        Self { tokens_dir: tokens_dir.into() }
    }

    /// Verify a presented token against the account's token file.
    pub fn verify(&self, account: &str, presented: &str) -> bool {
        // The account name becomes a path component; reject anything that
        // fails the name rule before touching the filesystem.
        if !validate_account_name(account) {
            return false;
        }
        let path = self.tokens_dir.join(format!("{account}.token"));
        let stored = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(account, error = %err, "token file unreadable");
                return false;
            }
        };
        constant_time_eq(stored.trim_end(), presented)
    }

    /// Write a fresh token file for an account (operator enrollment).
    /// Mode 0600; overwrites any existing token.
    pub fn issue(&self, account: &str, token: &str) -> std::io::Result<()> {
        if !validate_account_name(account) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid account name: {account}"),
            ));
        }
        std::fs::create_dir_all(&self.tokens_dir)?;
        let path = self.tokens_dir.join(format!("{account}.token"));
        std::fs::write(&path, token)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

/// Compare two strings without short-circuiting on the first mismatch.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut diff = a.len() ^ b.len();
    let len = a.len().min(b.len());
    for i in 0..len {
        diff |= usize::from(a[i] ^ b[i]);
    }
    diff == 0
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
