// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thrum_core::{AgentWorkContext, FileChange, SessionId};

use crate::errors::StorageError;

use super::Store;

fn row_to_context(row: &rusqlite::Row) -> rusqlite::Result<AgentWorkContext> {
    let unmerged_commits: String = row.get("unmerged_commits")?;
    let uncommitted_files: String = row.get("uncommitted_files")?;
    let changed_files: String = row.get("changed_files")?;
    let file_changes: String = row.get("file_changes")?;

    Ok(AgentWorkContext {
        session_id: row.get("session_id")?,
        agent_id: row.get("agent_id")?,
        branch: row.get("branch")?,
        worktree_path: row.get("worktree_path")?,
        unmerged_commits: serde_json::from_str(&unmerged_commits).unwrap_or_default(),
        uncommitted_files: serde_json::from_str(&uncommitted_files).unwrap_or_default(),
        changed_files: serde_json::from_str(&changed_files).unwrap_or_default(),
        file_changes: serde_json::from_str::<Vec<FileChange>>(&file_changes).unwrap_or_default(),
        git_updated_at: row.get("git_updated_at")?,
        current_task: row.get("current_task")?,
        task_updated_at: row.get("task_updated_at")?,
        intent: row.get("intent")?,
        intent_updated_at: row.get("intent_updated_at")?,
    })
}

pub fn upsert(conn: &Connection, ctx: &AgentWorkContext) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO agent_work_contexts
            (session_id, agent_id, branch, worktree_path, unmerged_commits, uncommitted_files,
             changed_files, file_changes, git_updated_at, current_task, task_updated_at, intent, intent_updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(session_id) DO UPDATE SET
            agent_id = excluded.agent_id,
            branch = excluded.branch,
            worktree_path = excluded.worktree_path,
            unmerged_commits = excluded.unmerged_commits,
            uncommitted_files = excluded.uncommitted_files,
            changed_files = excluded.changed_files,
            file_changes = excluded.file_changes,
            git_updated_at = excluded.git_updated_at,
            current_task = excluded.current_task,
            task_updated_at = excluded.task_updated_at,
            intent = excluded.intent,
            intent_updated_at = excluded.intent_updated_at",
        params![
            ctx.session_id,
            ctx.agent_id,
            ctx.branch,
            ctx.worktree_path,
            serde_json::to_string(&ctx.unmerged_commits)?,
            serde_json::to_string(&ctx.uncommitted_files)?,
            serde_json::to_string(&ctx.changed_files)?,
            serde_json::to_string(&ctx.file_changes)?,
            ctx.git_updated_at.to_rfc3339(),
            ctx.current_task,
            ctx.task_updated_at.map(|t| t.to_rfc3339()),
            ctx.intent,
            ctx.intent_updated_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, session_id: &SessionId) -> Result<Option<AgentWorkContext>, StorageError> {
    conn.query_row("SELECT * FROM agent_work_contexts WHERE session_id = ?1", params![session_id], row_to_context)
        .optional()
        .map_err(Into::into)
}

/// Upserts just the `intent` field, used by `session.set_intent`. The
/// session-active check (spec.md §4.2: "require an active session") is the
/// Projector's responsibility, against `sessions`; this creates the work
/// context row on first use rather than requiring it to preexist.
pub fn set_intent(conn: &Connection, session_id: &SessionId, agent_id: &thrum_core::AgentId, intent: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO agent_work_contexts (session_id, agent_id, git_updated_at, intent, intent_updated_at)
         VALUES (?1, ?2, ?3, ?4, ?3)
         ON CONFLICT(session_id) DO UPDATE SET intent = excluded.intent, intent_updated_at = excluded.intent_updated_at",
        params![session_id, agent_id, at.to_rfc3339(), intent],
    )?;
    Ok(())
}

pub fn set_task(conn: &Connection, session_id: &SessionId, agent_id: &thrum_core::AgentId, task: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO agent_work_contexts (session_id, agent_id, git_updated_at, current_task, task_updated_at)
         VALUES (?1, ?2, ?3, ?4, ?3)
         ON CONFLICT(session_id) DO UPDATE SET current_task = excluded.current_task, task_updated_at = excluded.task_updated_at",
        params![session_id, agent_id, at.to_rfc3339(), task],
    )?;
    Ok(())
}

impl Store {
    pub fn upsert_work_context(&self, ctx: &AgentWorkContext) -> Result<(), StorageError> {
        upsert(&self.conn, ctx)
    }

    pub fn get_work_context(&self, session_id: &SessionId) -> Result<Option<AgentWorkContext>, StorageError> {
        get(&self.conn, session_id)
    }

    pub fn set_work_context_intent(&self, session_id: &SessionId, agent_id: &thrum_core::AgentId, intent: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        set_intent(&self.conn, session_id, agent_id, intent, at)
    }

    pub fn set_work_context_task(&self, session_id: &SessionId, agent_id: &thrum_core::AgentId, task: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        set_task(&self.conn, session_id, agent_id, task, at)
    }
}
