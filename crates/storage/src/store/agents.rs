// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thrum_core::{Agent, AgentId, AgentKind};

use crate::errors::StorageError;

use super::Store;

fn row_to_agent(row: &rusqlite::Row) -> rusqlite::Result<Agent> {
    let kind: String = row.get("kind")?;
    Ok(Agent {
        agent_id: row.get("agent_id")?,
        kind: if kind == "user" { AgentKind::User } else { AgentKind::Agent },
        role: row.get("role")?,
        module: row.get("module")?,
        display: row.get("display")?,
        hostname: row.get("hostname")?,
        registered_at: row.get("registered_at")?,
        last_seen_at: row.get("last_seen_at")?,
    })
}

pub fn upsert(conn: &Connection, agent: &Agent) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO agents (agent_id, kind, role, module, display, hostname, registered_at, last_seen_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(agent_id) DO UPDATE SET
            role = excluded.role,
            module = excluded.module,
            display = excluded.display,
            hostname = excluded.hostname,
            last_seen_at = excluded.last_seen_at",
        params![
            agent.agent_id,
            agent.kind.to_string(),
            agent.role,
            agent.module,
            agent.display,
            agent.hostname,
            agent.registered_at.to_rfc3339(),
            agent.last_seen_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

/// Evicts whatever agent currently occupies `(role, module)`, for the
/// `force` registration path (spec.md §3).
pub fn delete_by_role_module(conn: &Connection, role: &str, module: &str) -> Result<(), StorageError> {
    conn.execute("DELETE FROM agents WHERE role = ?1 AND module = ?2", params![role, module])?;
    Ok(())
}

pub fn delete(conn: &Connection, agent_id: &AgentId) -> Result<(), StorageError> {
    conn.execute("DELETE FROM agents WHERE agent_id = ?1", params![agent_id])?;
    Ok(())
}

pub fn get_by_id(conn: &Connection, agent_id: &AgentId) -> Result<Option<Agent>, StorageError> {
    conn.query_row("SELECT * FROM agents WHERE agent_id = ?1", params![agent_id], row_to_agent)
        .optional()
        .map_err(Into::into)
}

pub fn get_by_role_module(conn: &Connection, role: &str, module: &str) -> Result<Option<Agent>, StorageError> {
    conn.query_row("SELECT * FROM agents WHERE role = ?1 AND module = ?2", params![role, module], row_to_agent)
        .optional()
        .map_err(Into::into)
}

/// Resolves `name` against either an agent id or a role name — the lookup
/// the Router uses for non-group mentions (spec.md §4.3 step 3).
pub fn find_by_id_or_role(conn: &Connection, name: &str) -> Result<Vec<Agent>, StorageError> {
    let mut stmt = conn.prepare("SELECT * FROM agents WHERE agent_id = ?1 OR role = ?1")?;
    let rows = stmt.query_map(params![name], row_to_agent)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub fn list(conn: &Connection) -> Result<Vec<Agent>, StorageError> {
    let mut stmt = conn.prepare("SELECT * FROM agents ORDER BY registered_at ASC")?;
    let rows = stmt.query_map([], row_to_agent)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// `role` already has a role-group iff a group named exactly `role` exists.
pub fn role_group_exists(conn: &Connection, role: &str) -> Result<bool, StorageError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM groups WHERE name = ?1", params![role], |r| r.get(0))?;
    Ok(count > 0)
}

pub fn touch_last_seen(conn: &Connection, agent_id: &AgentId, at: DateTime<Utc>) -> Result<(), StorageError> {
    conn.execute("UPDATE agents SET last_seen_at = ?1 WHERE agent_id = ?2", params![at.to_rfc3339(), agent_id])?;
    Ok(())
}

impl Store {
    pub fn upsert_agent(&self, agent: &Agent) -> Result<(), StorageError> {
        upsert(&self.conn, agent)
    }

    pub fn get_agent(&self, agent_id: &AgentId) -> Result<Option<Agent>, StorageError> {
        get_by_id(&self.conn, agent_id)
    }

    pub fn get_agent_by_role_module(&self, role: &str, module: &str) -> Result<Option<Agent>, StorageError> {
        get_by_role_module(&self.conn, role, module)
    }

    pub fn find_agents_by_id_or_role(&self, name: &str) -> Result<Vec<Agent>, StorageError> {
        find_by_id_or_role(&self.conn, name)
    }

    pub fn list_agents(&self) -> Result<Vec<Agent>, StorageError> {
        list(&self.conn)
    }

    pub fn delete_agent(&self, agent_id: &AgentId) -> Result<(), StorageError> {
        delete(&self.conn, agent_id)
    }
}
