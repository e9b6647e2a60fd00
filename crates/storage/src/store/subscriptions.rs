// SPDX-License-Identifier: MIT

use rusqlite::{params, Connection};
use thrum_core::{Scope, SessionId, Subscription, SubscriptionId};

use crate::errors::StorageError;

use super::Store;

fn row_to_subscription(row: &rusqlite::Row) -> rusqlite::Result<(SubscriptionId, Subscription)> {
    let scope_type: Option<String> = row.get("scope_type")?;
    let scope_value: Option<String> = row.get("scope_value")?;
    let scope = match (scope_type, scope_value) {
        (Some(t), Some(v)) => Some(scope_from_parts(&t, v)),
        _ => None,
    };
    Ok((
        row.get("id")?,
        Subscription {
            session_id: row.get("session_id")?,
            scope,
            mention_role: row.get("mention_role")?,
            all: row.get::<_, i64>("all_messages")? != 0,
            created_at: row.get("created_at")?,
        },
    ))
}

fn scope_from_parts(kind: &str, value: String) -> Scope {
    match kind {
        "module" => Scope::Module(value),
        "file" => Scope::File(value),
        "repo" => Scope::Repo(value),
        _ => Scope::Group(value),
    }
}

pub fn scope_parts(scope: &Scope) -> (&'static str, &str) {
    (scope.kind_str(), scope.value())
}

pub fn add(conn: &Connection, id: &SubscriptionId, sub: &Subscription) -> Result<(), StorageError> {
    let (scope_type, scope_value) = sub.scope.as_ref().map(scope_parts).unzip();
    conn.execute(
        "INSERT INTO subscriptions (id, session_id, scope_type, scope_value, mention_role, all_messages, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![id, sub.session_id, scope_type, scope_value, sub.mention_role, sub.all as i64, sub.created_at.to_rfc3339()],
    )?;
    Ok(())
}

pub fn remove(conn: &Connection, id: &SubscriptionId) -> Result<(), StorageError> {
    conn.execute("DELETE FROM subscriptions WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn remove_for_session(conn: &Connection, session_id: &SessionId) -> Result<(), StorageError> {
    conn.execute("DELETE FROM subscriptions WHERE session_id = ?1", params![session_id])?;
    Ok(())
}

pub fn list_for_session(conn: &Connection, session_id: &SessionId) -> Result<Vec<(SubscriptionId, Subscription)>, StorageError> {
    let mut stmt = conn.prepare("SELECT * FROM subscriptions WHERE session_id = ?1 ORDER BY created_at ASC")?;
    let rows = stmt.query_map(params![session_id], row_to_subscription)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// A snapshot of every live subscription, for the Dispatcher's post-commit
/// matching pass (spec.md §4.6). Reading this under no lock — the write
/// lock is released before dispatch runs — matches spec.md §5's "removed
/// subscription must not receive further notifications" rule as long as the
/// snapshot is taken after commit.
pub fn list_all(conn: &Connection) -> Result<Vec<(SubscriptionId, Subscription)>, StorageError> {
    let mut stmt = conn.prepare("SELECT * FROM subscriptions")?;
    let rows = stmt.query_map([], row_to_subscription)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

impl Store {
    pub fn add_subscription(&self, id: &SubscriptionId, sub: &Subscription) -> Result<(), StorageError> {
        add(&self.conn, id, sub)
    }

    pub fn remove_subscription(&self, id: &SubscriptionId) -> Result<(), StorageError> {
        remove(&self.conn, id)
    }

    pub fn remove_subscriptions_for_session(&self, session_id: &SessionId) -> Result<(), StorageError> {
        remove_for_session(&self.conn, session_id)
    }

    pub fn list_subscriptions_for_session(&self, session_id: &SessionId) -> Result<Vec<(SubscriptionId, Subscription)>, StorageError> {
        list_for_session(&self.conn, session_id)
    }

    pub fn list_all_subscriptions(&self) -> Result<Vec<(SubscriptionId, Subscription)>, StorageError> {
        list_all(&self.conn)
    }
}
