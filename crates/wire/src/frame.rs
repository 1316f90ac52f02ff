// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited JSON framing.
//!
//! The parser accumulates bytes, splits on `\n` and parses each complete
//! line as one JSON record. Blank lines and lines that are not valid JSON
//! are dropped without disturbing subsequent lines. The encoder is the
//! exact inverse: one JSON object, one trailing newline, no embedded
//! newlines.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Maximum size of a single record (1 MiB).
pub const MAX_RECORD_SIZE: usize = 1024 * 1024;

/// Maximum size of a streamed chunk payload (256 KiB).
pub const MAX_STREAM_CHUNK: usize = 256 * 1024;

/// Wire encoding errors.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record too large: {size} bytes (max {max})")]
    RecordTooLarge { size: usize, max: usize },
}

/// Encode a record to its wire form: compact JSON plus one `\n`.
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, WireError> {
    let mut bytes = serde_json::to_vec(record)?;
    if bytes.len() > MAX_RECORD_SIZE {
        return Err(WireError::RecordTooLarge { size: bytes.len(), max: MAX_RECORD_SIZE });
    }
    bytes.push(b'\n');
    Ok(bytes)
}

/// Encode an already-built JSON value.
pub fn encode_value(value: &Value) -> Result<Vec<u8>, WireError> {
    encode(value)
}

/// Incremental line-framed JSON parser.
#[derive(Debug, Default)]
pub struct LineParser {
    buf: Vec<u8>,
    /// Set while skipping the remainder of an oversize line.
    discarding: bool,
}

impl LineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every complete record they finish, in order.
    ///
    /// Partial trailing bytes are retained for the next call. Blank lines,
    /// invalid JSON and oversize lines yield nothing.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Value> {
        self.buf.extend_from_slice(bytes);

        let mut records = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if self.discarding {
                // Tail of an oversize line; the record was already dropped.
                self.discarding = false;
                continue;
            }
            let line = &line[..line.len() - 1]; // strip the newline
            if line.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }
            if line.len() > MAX_RECORD_SIZE {
                continue;
            }
            // Records are JSON objects; other JSON values are dropped
            // alongside unparseable lines.
            if let Ok(value @ Value::Object(_)) = serde_json::from_slice::<Value>(line) {
                records.push(value);
            }
        }

        // An unterminated line beyond the record cap can never become a
        // valid record; drop what we have and skip to the next newline.
        if self.buf.len() > MAX_RECORD_SIZE {
            self.buf.clear();
            self.discarding = true;
        }

        records
    }

    /// Bytes currently buffered waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
