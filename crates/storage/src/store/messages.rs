// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thrum_core::{AgentId, BodyFormat, Message, MessageEdit, MessageId, Ref, Scope, SessionId};

use crate::errors::StorageError;

use super::Store;

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
    let body_format: String = row.get("body_format")?;
    let body_structured: Option<String> = row.get("body_structured")?;
    Ok(Message {
        message_id: row.get("message_id")?,
        thread_id: row.get("thread_id")?,
        agent_id: row.get("agent_id")?,
        session_id: row.get("session_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted: row.get::<_, i64>("deleted")? != 0,
        deleted_at: row.get("deleted_at")?,
        delete_reason: row.get("delete_reason")?,
        body_format: body_format.parse().unwrap_or(BodyFormat::Plain),
        body_content: row.get("body_content")?,
        body_structured: body_structured.and_then(|s| serde_json::from_str(&s).ok()),
        authored_by: row.get("authored_by")?,
        disclosed: row.get::<_, i64>("disclosed")? != 0,
        scopes: Vec::new(),
        refs: Vec::new(),
    })
}

fn scope_kind_value(scope: &Scope) -> (&'static str, &str) {
    (scope.kind_str(), scope.value())
}

fn ref_kind_value(r: &Ref) -> (&'static str, String) {
    (r.kind_str(), r.value())
}

/// Inserts `message` plus its `scopes`/`refs` rows. Does not validate
/// recipients — the Router resolves mentions before the event is built; the
/// Projector here is purely mechanical.
pub fn insert(conn: &Connection, message: &Message) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO messages
            (message_id, thread_id, agent_id, session_id, created_at, updated_at, deleted,
             deleted_at, delete_reason, body_format, body_content, body_structured, authored_by, disclosed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, NULL, ?7, ?8, ?9, ?10, ?11)",
        params![
            message.message_id,
            message.thread_id,
            message.agent_id,
            message.session_id,
            message.created_at.to_rfc3339(),
            message.updated_at.map(|t| t.to_rfc3339()),
            message.body_format.as_str(),
            message.body_content,
            message.body_structured.as_ref().map(|v| v.to_string()),
            message.authored_by,
            message.disclosed as i64,
        ],
    )?;

    for scope in &message.scopes {
        let (kind, value) = scope_kind_value(scope);
        conn.execute(
            "INSERT INTO message_scopes (message_id, scope_type, scope_value) VALUES (?1, ?2, ?3)",
            params![message.message_id, kind, value],
        )?;
    }
    for r in &message.refs {
        let (kind, value) = ref_kind_value(r);
        conn.execute(
            "INSERT INTO message_refs (message_id, ref_type, ref_value) VALUES (?1, ?2, ?3)",
            params![message.message_id, kind, value],
        )?;
    }

    Ok(())
}

fn load_scopes(conn: &Connection, message_id: &MessageId) -> Result<Vec<Scope>, StorageError> {
    let mut stmt = conn.prepare("SELECT scope_type, scope_value FROM message_scopes WHERE message_id = ?1")?;
    let rows = stmt.query_map(params![message_id], |r| {
        let kind: String = r.get(0)?;
        let value: String = r.get(1)?;
        Ok(scope_from_parts(&kind, value))
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn scope_from_parts(kind: &str, value: String) -> Scope {
    match kind {
        "module" => Scope::Module(value),
        "file" => Scope::File(value),
        "repo" => Scope::Repo(value),
        _ => Scope::Group(value),
    }
}

fn load_refs(conn: &Connection, message_id: &MessageId) -> Result<Vec<Ref>, StorageError> {
    let mut stmt = conn.prepare("SELECT ref_type, ref_value FROM message_refs WHERE message_id = ?1")?;
    let rows = stmt.query_map(params![message_id], |r| {
        let kind: String = r.get(0)?;
        let value: String = r.get(1)?;
        Ok(ref_from_parts(&kind, value))
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn ref_from_parts(kind: &str, value: String) -> Ref {
    match kind {
        "mention" => Ref::Mention(value),
        "group" => Ref::Group(value),
        "reply_to" => Ref::ReplyTo(MessageId::from_string(value)),
        "issue" => Ref::Issue(value),
        _ => Ref::Commit(value),
    }
}

pub fn get(conn: &Connection, message_id: &MessageId) -> Result<Option<Message>, StorageError> {
    let Some(mut message) = conn
        .query_row("SELECT * FROM messages WHERE message_id = ?1", params![message_id], row_to_message)
        .optional()?
    else {
        return Ok(None);
    };
    message.scopes = load_scopes(conn, message_id)?;
    message.refs = load_refs(conn, message_id)?;
    Ok(Some(message))
}

pub fn exists(conn: &Connection, message_id: &MessageId) -> Result<bool, StorageError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages WHERE message_id = ?1", params![message_id], |r| r.get(0))?;
    Ok(count > 0)
}

pub fn append_edit(conn: &Connection, edit: &MessageEdit) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO message_edits (message_id, version, body_format, body_content, body_structured, edited_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            edit.message_id,
            edit.version,
            edit.body_format.as_str(),
            edit.body_content,
            edit.body_structured.as_ref().map(|v| v.to_string()),
            edit.edited_at.to_rfc3339(),
        ],
    )?;
    conn.execute(
        "UPDATE messages SET body_format = ?1, body_content = ?2, body_structured = ?3, updated_at = ?4 WHERE message_id = ?5",
        params![
            edit.body_format.as_str(),
            edit.body_content,
            edit.body_structured.as_ref().map(|v| v.to_string()),
            edit.edited_at.to_rfc3339(),
            edit.message_id,
        ],
    )?;
    Ok(())
}

pub fn next_edit_version(conn: &Connection, message_id: &MessageId) -> Result<u32, StorageError> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(version) FROM message_edits WHERE message_id = ?1",
        params![message_id],
        |r| r.get(0),
    )?;
    Ok(max.unwrap_or(0) as u32 + 1)
}

pub fn soft_delete(conn: &Connection, message_id: &MessageId, reason: Option<&str>, at: DateTime<Utc>) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE messages SET deleted = 1, deleted_at = ?1, delete_reason = ?2 WHERE message_id = ?3",
        params![at.to_rfc3339(), reason, message_id],
    )?;
    Ok(())
}

pub fn mark_read(conn: &Connection, message_id: &MessageId, session_id: &SessionId, agent_id: &AgentId, at: DateTime<Utc>) -> Result<bool, StorageError> {
    if !exists(conn, message_id)? {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO message_reads (message_id, session_id, agent_id, read_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(message_id, session_id) DO UPDATE SET read_at = excluded.read_at",
        params![message_id, session_id, agent_id, at.to_rfc3339()],
    )?;
    Ok(true)
}

pub fn is_read(conn: &Connection, message_id: &MessageId, agent_id: &AgentId) -> Result<bool, StorageError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM message_reads WHERE message_id = ?1 AND agent_id = ?2",
        params![message_id, agent_id],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Every message matching `agent_id`, without deleting anything. Used by
/// `message.archive` to snapshot the archive file before any row vanishes.
pub fn find_by_agent(conn: &Connection, agent_id: &AgentId) -> Result<Vec<Message>, StorageError> {
    let mut stmt = conn.prepare("SELECT message_id FROM messages WHERE agent_id = ?1")?;
    let ids: Vec<MessageId> = stmt.query_map(params![agent_id], |r| r.get(0))?.collect::<Result<_, _>>()?;
    drop(stmt);
    ids.iter().filter_map(|id| get(conn, id).transpose()).collect()
}

/// Every message carrying `scope(group, name)`, without deleting anything.
pub fn find_by_scope(conn: &Connection, scope: &Scope) -> Result<Vec<Message>, StorageError> {
    let (kind, value) = scope_kind_value(scope);
    let mut stmt = conn.prepare("SELECT message_id FROM message_scopes WHERE scope_type = ?1 AND scope_value = ?2")?;
    let ids: Vec<MessageId> = stmt.query_map(params![kind, value], |r| r.get(0))?.collect::<Result<_, _>>()?;
    drop(stmt);
    ids.iter().filter_map(|id| get(conn, id).transpose()).collect()
}

/// Hard-deletes exactly the given message ids. Used after an archive file
/// has already been written, so the only messages removed are the ones that
/// made it into the file.
pub fn delete_by_ids(conn: &Connection, ids: &[MessageId]) -> Result<usize, StorageError> {
    let mut count = 0;
    for id in ids {
        count += conn.execute("DELETE FROM messages WHERE message_id = ?1", params![id])?;
    }
    Ok(count)
}

/// Hard-deletes every message matching `agent_id` (used by
/// `message.deleteByAgent`), returning the deleted rows.
pub fn delete_by_agent(conn: &Connection, agent_id: &AgentId) -> Result<Vec<Message>, StorageError> {
    let out = find_by_agent(conn, agent_id)?;
    conn.execute("DELETE FROM messages WHERE agent_id = ?1", params![agent_id])?;
    Ok(out)
}

/// Hard-deletes every message carrying `scope(group, name)` (used by
/// `message.deleteByScope`).
pub fn delete_by_scope(conn: &Connection, scope: &Scope) -> Result<Vec<Message>, StorageError> {
    let out = find_by_scope(conn, scope)?;
    let (kind, value) = scope_kind_value(scope);
    let ids: Vec<MessageId> = out.iter().map(|m| m.message_id.clone()).collect();
    let _ = (&kind, &value);
    for id in &ids {
        conn.execute("DELETE FROM messages WHERE message_id = ?1", params![id])?;
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct ListMessagesFilter {
    pub for_agent: Option<String>,
    pub for_agent_role: Option<String>,
    pub thread_id: Option<ThreadIdFilter>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub page: u32,
    pub page_size: u32,
    /// spec.md §9 open question: gate the legacy-broadcast inbox arm behind
    /// config rather than always honoring it.
    pub legacy_broadcast_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct ThreadIdFilter(pub thrum_core::ThreadId);

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub message: Message,
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboxPage {
    pub messages: Vec<MessageRow>,
    pub total: u64,
    pub unread: u64,
    pub total_pages: u64,
}

/// The inbox query (spec.md §4.5). Builds a `message_id IN (...)` predicate
/// from the three delivery arms (mention / group membership / legacy
/// broadcast), then paginates and sorts.
pub fn list_inbox(conn: &Connection, filter: &ListMessagesFilter) -> Result<InboxPage, StorageError> {
    let page_size = filter.page_size.clamp(1, 100);
    let page = filter.page.max(1);

    let candidate_ids = match (&filter.for_agent, &filter.for_agent_role) {
        (Some(agent), role) => inbox_candidate_ids(conn, agent, role.as_deref(), filter.legacy_broadcast_enabled)?,
        (None, _) => all_message_ids(conn)?,
    };

    if candidate_ids.is_empty() {
        return Ok(InboxPage { messages: Vec::new(), total: 0, unread: 0, total_pages: 0 });
    }

    let mut messages = Vec::with_capacity(candidate_ids.len());
    for id in &candidate_ids {
        if let Some(thread_filter) = &filter.thread_id {
            if let Some(m) = get(conn, id)? {
                if m.thread_id.as_ref() != Some(&thread_filter.0) {
                    continue;
                }
                messages.push(m);
            }
        } else if let Some(m) = get(conn, id)? {
            messages.push(m);
        }
    }

    sort_messages(&mut messages, filter);

    let total = messages.len() as u64;
    let unread = match &filter.for_agent {
        Some(agent) => {
            let agent_id = resolve_agent_id(conn, agent)?;
            match agent_id {
                Some(agent_id) => messages.iter().filter(|m| !is_read(conn, &m.message_id, &agent_id).unwrap_or(false)).count() as u64,
                None => 0,
            }
        }
        None => 0,
    };

    let start = ((page - 1) as usize) * (page_size as usize);
    let page_messages: Vec<Message> = messages.into_iter().skip(start).take(page_size as usize).collect();

    let agent_id = match &filter.for_agent {
        Some(agent) => resolve_agent_id(conn, agent)?,
        None => None,
    };

    let rows = page_messages
        .into_iter()
        .map(|m| {
            let read = match &agent_id {
                Some(a) => is_read(conn, &m.message_id, a).unwrap_or(false),
                None => false,
            };
            MessageRow { message: m, is_read: read }
        })
        .collect();

    let total_pages = total.div_ceil(page_size as u64);
    Ok(InboxPage { messages: rows, total, unread, total_pages })
}

/// `for_agent` is usually an `agent_id`, but mention/group resolution
/// matches on names too; fall back to treating it as a literal id so
/// `is_read` lookups still work for identity-as-name registrations.
fn resolve_agent_id(conn: &Connection, name_or_id: &str) -> Result<Option<AgentId>, StorageError> {
    let found: Option<AgentId> =
        conn.query_row("SELECT agent_id FROM agents WHERE agent_id = ?1", params![name_or_id], |r| r.get(0)).optional()?;
    Ok(Some(found.unwrap_or_else(|| AgentId::from_string(name_or_id))))
}

fn all_message_ids(conn: &Connection) -> Result<Vec<MessageId>, StorageError> {
    let mut stmt = conn.prepare("SELECT message_id FROM messages WHERE deleted = 0")?;
    let rows = stmt.query_map([], |r| r.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Implements the three arms of spec.md §4.5.
fn inbox_candidate_ids(
    conn: &Connection,
    for_agent: &str,
    for_agent_role: Option<&str>,
    legacy_broadcast_enabled: bool,
) -> Result<Vec<MessageId>, StorageError> {
    let mut ids = std::collections::BTreeSet::new();

    // Arm 1: direct mention by name.
    let mut stmt = conn.prepare(
        "SELECT message_id FROM message_refs WHERE ref_type = 'mention' AND ref_value = ?1",
    )?;
    for id in stmt.query_map(params![for_agent], |r| r.get::<_, MessageId>(0))? {
        ids.insert(id?);
    }
    drop(stmt);

    // Arm 2: group-scope membership.
    let mut stmt = conn.prepare("SELECT DISTINCT scope_value FROM message_scopes WHERE scope_type = 'group'")?;
    let group_names: Vec<String> = stmt.query_map([], |r| r.get(0))?.collect::<Result<_, _>>()?;
    drop(stmt);

    for name in &group_names {
        let matches = super::groups::group_matches_agent(conn, name, &AgentId::from_string(for_agent), for_agent_role.unwrap_or(""))?;
        if !matches {
            continue;
        }
        let mut stmt = conn.prepare("SELECT message_id FROM message_scopes WHERE scope_type = 'group' AND scope_value = ?1")?;
        for id in stmt.query_map(params![name], |r| r.get::<_, MessageId>(0))? {
            ids.insert(id?);
        }
    }

    // Arm 3: legacy broadcast — messages with neither a mention ref nor a
    // group scope. Gated behind config per spec.md §9's open question.
    if legacy_broadcast_enabled {
        let mut stmt = conn.prepare(
            "SELECT message_id FROM messages m WHERE deleted = 0
               AND NOT EXISTS (SELECT 1 FROM message_refs r WHERE r.message_id = m.message_id AND r.ref_type = 'mention')
               AND NOT EXISTS (SELECT 1 FROM message_scopes s WHERE s.message_id = m.message_id AND s.scope_type = 'group')",
        )?;
        for id in stmt.query_map([], |r| r.get::<_, MessageId>(0))? {
            ids.insert(id?);
        }
    }

    Ok(ids.into_iter().collect())
}

fn sort_messages(messages: &mut [Message], filter: &ListMessagesFilter) {
    let clustering = filter.for_agent.is_some() && filter.sort_order.is_none();

    if clustering {
        messages.sort_by(|a, b| {
            let a_key = a.reply_to().cloned().unwrap_or_else(|| a.message_id.clone());
            let b_key = b.reply_to().cloned().unwrap_or_else(|| b.message_id.clone());
            a_key.cmp(&b_key).then_with(|| a.created_at.cmp(&b.created_at))
        });
    } else {
        let order = filter.sort_order.unwrap_or(SortOrder::Desc);
        messages.sort_by(|a, b| match order {
            SortOrder::Asc => a.created_at.cmp(&b.created_at),
            SortOrder::Desc => b.created_at.cmp(&a.created_at),
        });
    }
}

impl Store {
    pub fn insert_message(&self, message: &Message) -> Result<(), StorageError> {
        insert(&self.conn, message)
    }

    pub fn get_message(&self, message_id: &MessageId) -> Result<Option<Message>, StorageError> {
        get(&self.conn, message_id)
    }

    pub fn message_exists(&self, message_id: &MessageId) -> Result<bool, StorageError> {
        exists(&self.conn, message_id)
    }

    pub fn append_message_edit(&self, edit: &MessageEdit) -> Result<(), StorageError> {
        append_edit(&self.conn, edit)
    }

    pub fn next_edit_version(&self, message_id: &MessageId) -> Result<u32, StorageError> {
        next_edit_version(&self.conn, message_id)
    }

    pub fn soft_delete_message(&self, message_id: &MessageId, reason: Option<&str>, at: DateTime<Utc>) -> Result<(), StorageError> {
        soft_delete(&self.conn, message_id, reason, at)
    }

    pub fn mark_message_read(&self, message_id: &MessageId, session_id: &SessionId, agent_id: &AgentId, at: DateTime<Utc>) -> Result<bool, StorageError> {
        mark_read(&self.conn, message_id, session_id, agent_id, at)
    }

    pub fn is_message_read(&self, message_id: &MessageId, agent_id: &AgentId) -> Result<bool, StorageError> {
        is_read(&self.conn, message_id, agent_id)
    }

    pub fn delete_messages_by_agent(&self, agent_id: &AgentId) -> Result<Vec<Message>, StorageError> {
        delete_by_agent(&self.conn, agent_id)
    }

    pub fn delete_messages_by_scope(&self, scope: &Scope) -> Result<Vec<Message>, StorageError> {
        delete_by_scope(&self.conn, scope)
    }

    pub fn find_messages_by_agent(&self, agent_id: &AgentId) -> Result<Vec<Message>, StorageError> {
        find_by_agent(&self.conn, agent_id)
    }

    pub fn find_messages_by_scope(&self, scope: &Scope) -> Result<Vec<Message>, StorageError> {
        find_by_scope(&self.conn, scope)
    }

    pub fn delete_messages_by_ids(&self, ids: &[MessageId]) -> Result<usize, StorageError> {
        delete_by_ids(&self.conn, ids)
    }

    pub fn list_inbox(&self, filter: &ListMessagesFilter) -> Result<InboxPage, StorageError> {
        list_inbox(&self.conn, filter)
    }
}

#[cfg(test)]
mod kind_value_tests {
    use super::*;

    #[yare::parameterized(
        group = { Scope::Group("reviewers".into()), "group", "reviewers" },
        module = { Scope::Module("wire".into()), "module", "wire" },
        file = { Scope::File("src/lib.rs".into()), "file", "src/lib.rs" },
        repo = { Scope::Repo("thrum".into()), "repo", "thrum" },
    )]
    fn scope_round_trips_through_parts(scope: Scope, kind: &str, value: &str) {
        let (k, v) = scope_kind_value(&scope);
        assert_eq!(k, kind);
        assert_eq!(v, value);
        assert_eq!(scope_from_parts(k, v.to_string()), scope);
    }

    #[yare::parameterized(
        mention = { Ref::Mention("reviewer".into()), "mention", "reviewer" },
        group = { Ref::Group("reviewers".into()), "group", "reviewers" },
        issue = { Ref::Issue("123".into()), "issue", "123" },
        commit = { Ref::Commit("abc123".into()), "commit", "abc123" },
    )]
    fn ref_round_trips_through_parts(r: Ref, kind: &str, value: &str) {
        let (k, v) = ref_kind_value(&r);
        assert_eq!(k, kind);
        assert_eq!(v, value);
        assert_eq!(ref_from_parts(k, v), r);
    }
}
