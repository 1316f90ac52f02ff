// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-recipient inbox.

use std::collections::HashMap;

use hub_core::{Message, MessageId, MessageKind};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};

use crate::{Store, StoreError};

const MS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Message inbox backed by the shared hub database.
pub struct MessageStore {
    conn: Mutex<Connection>,
}

impl MessageStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    /// Queue a message. Assigns `read = false`, `archived = false`.
    pub fn add(&self, message: &Message) -> Result<MessageId, StoreError> {
        let context_json = match &message.context {
            Some(context) => Some(serde_json::to_string(context)?),
            None => None,
        };
        let conn = self.conn.lock();
        conn.execute(
            r#"INSERT INTO messages (id, "from", "to", kind, content, timestamp, read, archived, context_json)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, ?7)"#,
            params![
                message.id.as_str(),
                message.from,
                message.to,
                message.kind.as_str(),
                message.content,
                message.timestamp,
                context_json,
            ],
        )?;
        Ok(message.id.clone())
    }

    /// Unread, unarchived messages for an account, oldest first.
    pub fn unread(&self, account: &str) -> Result<Vec<Message>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"SELECT id, "from", "to", kind, content, timestamp, read, context_json
               FROM messages
               WHERE "to" = ?1 AND read = 0 AND archived = 0
               ORDER BY timestamp ASC"#,
        )?;
        let rows = stmt.query_map(params![account], row_to_message)?;
        collect_messages(rows)
    }

    /// A page of messages (read ones included), oldest first.
    pub fn paged(&self, account: &str, limit: u32, offset: u32) -> Result<Vec<Message>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"SELECT id, "from", "to", kind, content, timestamp, read, context_json
               FROM messages
               WHERE "to" = ?1 AND archived = 0
               ORDER BY timestamp ASC
               LIMIT ?2 OFFSET ?3"#,
        )?;
        let rows = stmt.query_map(params![account, limit, offset], row_to_message)?;
        collect_messages(rows)
    }

    /// Look up one message by id.
    pub fn get(&self, id: &str) -> Result<Message, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"SELECT id, "from", "to", kind, content, timestamp, read, context_json
               FROM messages WHERE id = ?1"#,
        )?;
        let mut rows = stmt.query_map(params![id], row_to_message)?;
        match rows.next() {
            Some(row) => Ok(row?),
            None => Err(StoreError::NotFound(format!("message {id}"))),
        }
    }

    /// Mark every unread, unarchived message for `account` as read.
    /// Idempotent: a second call is a no-op.
    pub fn mark_all_read(&self, account: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            r#"UPDATE messages SET read = 1 WHERE "to" = ?1 AND read = 0 AND archived = 0"#,
            params![account],
        )?;
        Ok(changed)
    }

    /// Archive read messages older than `days` days. Returns the count.
    ///
    /// Rows are flagged, never deleted. Unread messages are preserved
    /// regardless of age.
    pub fn archive_old(&self, days: u32, now_ms: u64) -> Result<usize, StoreError> {
        let cutoff = now_ms.saturating_sub(u64::from(days) * MS_PER_DAY);
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE messages SET archived = 1 WHERE read = 1 AND archived = 0 AND timestamp < ?1",
            params![cutoff],
        )?;
        Ok(changed)
    }
}

impl Store for MessageStore {
    fn init(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                "from" TEXT NOT NULL,
                "to" TEXT NOT NULL,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                archived INTEGER NOT NULL DEFAULT 0,
                context_json TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_messages_inbox
                ON messages ("to", read, archived);
            "#,
        )?;
        Ok(())
    }

    fn close(self) -> Result<(), StoreError> {
        let conn = self.conn.into_inner();
        conn.close().map_err(|(_, e)| StoreError::Db(e))
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let id: String = row.get(0)?;
    let kind: String = row.get(3)?;
    let context_json: Option<String> = row.get(7)?;
    let context: Option<HashMap<String, String>> =
        context_json.and_then(|raw| serde_json::from_str(&raw).ok());
    Ok(Message {
        id: MessageId::from_string(id),
        from: row.get(1)?,
        to: row.get(2)?,
        kind: MessageKind::parse(&kind).unwrap_or(MessageKind::Message),
        content: row.get(4)?,
        timestamp: row.get(5)?,
        read: row.get::<_, i64>(6)? != 0,
        context,
    })
}

fn collect_messages(
    rows: impl Iterator<Item = rusqlite::Result<Message>>,
) -> Result<Vec<Message>, StoreError> {
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
