// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSON result caches (council runs, verification receipts).
//!
//! The cache is a JSON array on disk. Appends rewrite the whole file via a
//! temp file and atomic rename, so readers never observe a torn write.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::StoreError;

/// A JSON-array file that results are appended to.
pub struct ResultCache {
    path: PathBuf,
}

impl ResultCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the file on first use.
    pub fn append<T: Serialize>(&self, entry: &T) -> Result<(), StoreError> {
        let mut entries = self.read_all()?;
        entries.push(serde_json::to_value(entry)?);
        self.write_atomic(&entries)
    }

    /// All cached entries; an unreadable or corrupt file reads as empty.
    pub fn read_all(&self) -> Result<Vec<Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "corrupt result cache, starting fresh");
                Ok(Vec::new())
            }
        }
    }

    fn write_atomic(&self, entries: &[Value]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
