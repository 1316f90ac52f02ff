// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! hub-store: durable state for the hub daemon.
//!
//! Message, task and trust state live in single-file SQLite databases under
//! the hub directory. Each store owns its own connection behind a mutex and
//! exposes thread-safe operations; JSON result caches are rewritten
//! atomically (temp file + rename).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod cache;
mod messages;
mod tasks;
mod trust;

pub use cache::ResultCache;
pub use messages::MessageStore;
pub use tasks::TaskStore;
pub use trust::{TrustEvent, TrustStore};

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),
}

/// Common lifecycle for the persistent stores.
pub trait Store {
    /// Create tables and indexes if missing.
    fn init(&self) -> Result<(), StoreError>;

    /// Flush and release the underlying connection.
    fn close(self) -> Result<(), StoreError>;
}

/// Open a single-file database with the pragmas every store relies on.
///
/// WAL journal mode for concurrent readers, NORMAL synchronous (the WAL
/// still survives process crashes), 10 s busy timeout.
pub fn open_db(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(10))?;
    // PRAGMA journal_mode returns a row; query_row to consume it
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    conn.execute_batch("PRAGMA synchronous = NORMAL")?;
    Ok(conn)
}

/// Open an in-memory database (tests and ephemeral tooling).
pub fn open_memory_db() -> Result<Connection, StoreError> {
    Ok(Connection::open_in_memory()?)
}
