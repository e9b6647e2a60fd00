// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thrum_core::{AgentId, ThreadId};

use crate::errors::StorageError;

use super::Store;

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadRow {
    pub thread_id: ThreadId,
    pub created_by: AgentId,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn row_to_thread(row: &rusqlite::Row) -> rusqlite::Result<ThreadRow> {
    Ok(ThreadRow {
        thread_id: row.get("thread_id")?,
        created_by: row.get("created_by")?,
        title: row.get("title")?,
        created_at: row.get("created_at")?,
    })
}

pub fn create(conn: &Connection, row: &ThreadRow) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO threads (thread_id, created_by, title, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![row.thread_id, row.created_by, row.title, row.created_at.to_rfc3339()],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, thread_id: &ThreadId) -> Result<Option<ThreadRow>, StorageError> {
    conn.query_row("SELECT * FROM threads WHERE thread_id = ?1", params![thread_id], row_to_thread)
        .optional()
        .map_err(Into::into)
}

pub fn list(conn: &Connection) -> Result<Vec<ThreadRow>, StorageError> {
    let mut stmt = conn.prepare("SELECT * FROM threads ORDER BY created_at DESC")?;
    let rows = stmt.query_map([], row_to_thread)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Reply count and most recent reply for `thread.list`/`notify.thread`.
pub fn reply_stats(conn: &Connection, thread_id: &ThreadId) -> Result<(u64, Option<DateTime<Utc>>, Option<AgentId>), StorageError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE thread_id = ?1 AND deleted = 0",
        params![thread_id],
        |r| r.get(0),
    )?;
    let last: Option<(String, String)> = conn
        .query_row(
            "SELECT created_at, agent_id FROM messages WHERE thread_id = ?1 AND deleted = 0 ORDER BY created_at DESC LIMIT 1",
            params![thread_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    match last {
        Some((ts, agent)) => {
            let parsed = DateTime::parse_from_rfc3339(&ts).map(|t| t.with_timezone(&Utc)).ok();
            Ok((count as u64, parsed, Some(AgentId::from_string(agent))))
        }
        None => Ok((count as u64, None, None)),
    }
}

impl Store {
    pub fn create_thread(&self, row: &ThreadRow) -> Result<(), StorageError> {
        create(&self.conn, row)
    }

    pub fn get_thread(&self, thread_id: &ThreadId) -> Result<Option<ThreadRow>, StorageError> {
        get(&self.conn, thread_id)
    }

    pub fn list_threads(&self) -> Result<Vec<ThreadRow>, StorageError> {
        list(&self.conn)
    }

    pub fn thread_reply_stats(&self, thread_id: &ThreadId) -> Result<(u64, Option<DateTime<Utc>>, Option<AgentId>), StorageError> {
        reply_stats(&self.conn, thread_id)
    }
}
