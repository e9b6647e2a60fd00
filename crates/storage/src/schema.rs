// SPDX-License-Identifier: MIT

//! Relational schema for the projected store (spec.md §3).
//!
//! Grounded in the chat-room example's `db.rs::migrate` — idempotent
//! `CREATE TABLE IF NOT EXISTS` blocks plus best-effort `ALTER TABLE ...
//! ADD COLUMN` calls swallowed with `.ok()` for forward migrations, run
//! inside a single connection at open time.

use rusqlite::Connection;

use crate::errors::StorageError;

/// Bumped whenever a migration adds schema this version didn't have.
/// Mirrors the `.thrum/schema_version` file spec.md §6 lists alongside the
/// DB file itself.
pub const SCHEMA_VERSION: i64 = 1;

pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS agents (
            agent_id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            role TEXT NOT NULL,
            module TEXT NOT NULL,
            display TEXT,
            hostname TEXT,
            registered_at TEXT NOT NULL,
            last_seen_at TEXT,
            UNIQUE(role, module)
        );

        CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            agent_id TEXT NOT NULL REFERENCES agents(agent_id),
            started_at TEXT NOT NULL,
            ended_at TEXT,
            end_reason TEXT,
            last_seen_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_agent ON sessions(agent_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_active ON sessions(ended_at);

        CREATE TABLE IF NOT EXISTS threads (
            thread_id TEXT PRIMARY KEY,
            created_by TEXT NOT NULL,
            title TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            message_id TEXT PRIMARY KEY,
            thread_id TEXT REFERENCES threads(thread_id),
            agent_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT,
            deleted INTEGER NOT NULL DEFAULT 0,
            deleted_at TEXT,
            delete_reason TEXT,
            body_format TEXT NOT NULL,
            body_content TEXT NOT NULL,
            body_structured TEXT,
            authored_by TEXT,
            disclosed INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages(thread_id);
        CREATE INDEX IF NOT EXISTS idx_messages_agent ON messages(agent_id);
        CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at);

        CREATE TABLE IF NOT EXISTS message_scopes (
            message_id TEXT NOT NULL REFERENCES messages(message_id) ON DELETE CASCADE,
            scope_type TEXT NOT NULL,
            scope_value TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_message_scopes_message ON message_scopes(message_id);
        CREATE INDEX IF NOT EXISTS idx_message_scopes_lookup ON message_scopes(scope_type, scope_value);

        CREATE TABLE IF NOT EXISTS message_refs (
            message_id TEXT NOT NULL REFERENCES messages(message_id) ON DELETE CASCADE,
            ref_type TEXT NOT NULL,
            ref_value TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_message_refs_message ON message_refs(message_id);
        CREATE INDEX IF NOT EXISTS idx_message_refs_lookup ON message_refs(ref_type, ref_value);

        CREATE TABLE IF NOT EXISTS message_reads (
            message_id TEXT NOT NULL REFERENCES messages(message_id) ON DELETE CASCADE,
            session_id TEXT NOT NULL,
            agent_id TEXT NOT NULL,
            read_at TEXT NOT NULL,
            PRIMARY KEY (message_id, session_id)
        );
        CREATE INDEX IF NOT EXISTS idx_message_reads_agent ON message_reads(agent_id);

        CREATE TABLE IF NOT EXISTS message_edits (
            message_id TEXT NOT NULL REFERENCES messages(message_id) ON DELETE CASCADE,
            version INTEGER NOT NULL,
            body_format TEXT NOT NULL,
            body_content TEXT NOT NULL,
            body_structured TEXT,
            edited_at TEXT NOT NULL,
            PRIMARY KEY (message_id, version)
        );

        CREATE TABLE IF NOT EXISTS groups (
            group_id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            created_at TEXT NOT NULL,
            created_by TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id TEXT NOT NULL REFERENCES groups(group_id) ON DELETE CASCADE,
            member_type TEXT NOT NULL,
            member_value TEXT NOT NULL,
            added_at TEXT NOT NULL,
            added_by TEXT,
            PRIMARY KEY (group_id, member_type, member_value)
        );

        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            scope_type TEXT,
            scope_value TEXT,
            mention_role TEXT,
            all_messages INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_subscriptions_session ON subscriptions(session_id);

        CREATE TABLE IF NOT EXISTS agent_work_contexts (
            session_id TEXT PRIMARY KEY,
            agent_id TEXT NOT NULL,
            branch TEXT,
            worktree_path TEXT,
            unmerged_commits TEXT NOT NULL DEFAULT '[]',
            uncommitted_files TEXT NOT NULL DEFAULT '[]',
            changed_files TEXT NOT NULL DEFAULT '[]',
            file_changes TEXT NOT NULL DEFAULT '[]',
            git_updated_at TEXT NOT NULL,
            current_task TEXT,
            task_updated_at TEXT,
            intent TEXT,
            intent_updated_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_work_contexts_agent ON agent_work_contexts(agent_id);

        CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='messages'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn schema_version_is_recorded() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
