// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thrum_core::{AgentId, EndReason, Session, SessionId};

use crate::errors::StorageError;

use super::Store;

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    let end_reason: Option<String> = row.get("end_reason")?;
    Ok(Session {
        session_id: row.get("session_id")?,
        agent_id: row.get("agent_id")?,
        started_at: row.get("started_at")?,
        ended_at: row.get("ended_at")?,
        end_reason: end_reason.and_then(|s| s.parse().ok()),
        last_seen_at: row.get("last_seen_at")?,
    })
}

pub fn insert(conn: &Connection, session: &Session) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO sessions (session_id, agent_id, started_at, ended_at, end_reason, last_seen_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            session.session_id,
            session.agent_id,
            session.started_at.to_rfc3339(),
            session.ended_at.map(|t| t.to_rfc3339()),
            session.end_reason.map(|r| r.as_str()),
            session.last_seen_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn end(conn: &Connection, session_id: &SessionId, reason: EndReason, at: DateTime<Utc>) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE sessions SET ended_at = ?1, end_reason = ?2 WHERE session_id = ?3 AND ended_at IS NULL",
        params![at.to_rfc3339(), reason.as_str(), session_id],
    )?;
    Ok(())
}

/// Closes every still-open session belonging to `agent_id` as
/// `crash_recovered` — called just before inserting a new `session.start`
/// row for the same agent (spec.md §4.2 `session.start` effect).
pub fn close_open_for_agent(conn: &Connection, agent_id: &AgentId, at: DateTime<Utc>) -> Result<u64, StorageError> {
    let n = conn.execute(
        "UPDATE sessions SET ended_at = ?1, end_reason = ?2 WHERE agent_id = ?3 AND ended_at IS NULL",
        params![at.to_rfc3339(), EndReason::CrashRecovered.as_str(), agent_id],
    )?;
    Ok(n as u64)
}

/// The startup crash-recovery sweep (spec.md §4.7): every session still
/// open when the daemon starts could not have survived the crash, so it is
/// closed unconditionally before the listener starts accepting connections.
pub fn close_all_open(conn: &Connection, at: DateTime<Utc>) -> Result<u64, StorageError> {
    let n = conn.execute(
        "UPDATE sessions SET ended_at = ?1, end_reason = ?2 WHERE ended_at IS NULL",
        params![at.to_rfc3339(), EndReason::CrashRecovered.as_str()],
    )?;
    Ok(n as u64)
}

pub fn touch_heartbeat(conn: &Connection, session_id: &SessionId, at: DateTime<Utc>) -> Result<(), StorageError> {
    conn.execute("UPDATE sessions SET last_seen_at = ?1 WHERE session_id = ?2", params![at.to_rfc3339(), session_id])?;
    Ok(())
}

pub fn get(conn: &Connection, session_id: &SessionId) -> Result<Option<Session>, StorageError> {
    conn.query_row("SELECT * FROM sessions WHERE session_id = ?1", params![session_id], row_to_session)
        .optional()
        .map_err(Into::into)
}

pub fn list_open(conn: &Connection) -> Result<Vec<Session>, StorageError> {
    let mut stmt = conn.prepare("SELECT * FROM sessions WHERE ended_at IS NULL ORDER BY started_at ASC")?;
    let rows = stmt.query_map([], row_to_session)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub fn list_for_agent(conn: &Connection, agent_id: &AgentId) -> Result<Vec<Session>, StorageError> {
    let mut stmt = conn.prepare("SELECT * FROM sessions WHERE agent_id = ?1 ORDER BY started_at DESC")?;
    let rows = stmt.query_map(params![agent_id], row_to_session)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

impl Store {
    pub fn insert_session(&self, session: &Session) -> Result<(), StorageError> {
        insert(&self.conn, session)
    }

    pub fn end_session(&self, session_id: &SessionId, reason: EndReason, at: DateTime<Utc>) -> Result<(), StorageError> {
        end(&self.conn, session_id, reason, at)
    }

    pub fn close_open_sessions_for_agent(&self, agent_id: &AgentId, at: DateTime<Utc>) -> Result<u64, StorageError> {
        close_open_for_agent(&self.conn, agent_id, at)
    }

    pub fn close_all_open_sessions(&self, at: DateTime<Utc>) -> Result<u64, StorageError> {
        close_all_open(&self.conn, at)
    }

    pub fn touch_session_heartbeat(&self, session_id: &SessionId, at: DateTime<Utc>) -> Result<(), StorageError> {
        touch_heartbeat(&self.conn, session_id, at)
    }

    pub fn get_session(&self, session_id: &SessionId) -> Result<Option<Session>, StorageError> {
        get(&self.conn, session_id)
    }

    pub fn list_open_sessions(&self) -> Result<Vec<Session>, StorageError> {
        list_open(&self.conn)
    }

    pub fn list_sessions_for_agent(&self, agent_id: &AgentId) -> Result<Vec<Session>, StorageError> {
        list_for_agent(&self.conn, agent_id)
    }
}
