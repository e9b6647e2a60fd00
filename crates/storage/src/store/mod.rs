// SPDX-License-Identifier: MIT

//! The relational projection: one `rusqlite::Connection` wrapped behind
//! query/mutation methods grouped by entity, mirroring the teacher's
//! `state/{agents,sessions,jobs,...}.rs` split (`MaterializedState` there is
//! an in-memory `HashMap`; here it is a SQLite connection because spec.md
//! §4.5's inbox query needs real joins and `LIMIT/OFFSET` pagination).

pub(crate) mod agents;
pub(crate) mod groups;
pub(crate) mod messages;
pub(crate) mod sessions;
pub(crate) mod subscriptions;
pub(crate) mod threads;
pub(crate) mod work_contexts;

pub use messages::{InboxPage, ListMessagesFilter, MessageRow, SortOrder, ThreadIdFilter};
pub use threads::ThreadRow;

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::errors::StorageError;
use crate::schema;

/// The projected relational store. All mutation happens through
/// `crate::projector::Projector`; `Store` itself is a thin, honest wrapper
/// around SQL — it has no event-sourcing awareness.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Runs `f` inside a SQL transaction, committing on `Ok` and rolling
    /// back on `Err`. The Projector calls this once per event (spec.md
    /// §4.2): the event is durable in the `EventLog` first, then applied to
    /// the `Store` inside exactly one transaction.
    pub fn with_transaction<T>(
        &mut self,
        f: impl FnOnce(&rusqlite::Transaction) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let tx = self.conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Applies one logged event inside a single transaction. Used both for
    /// live writes (after the `EventLog` append has been flushed to disk) and
    /// for replaying the log on startup — the same code path either way, so
    /// replay can never drift from live application.
    ///
    /// Also advances `processed_seq` (`store_meta`) in the same transaction,
    /// so the projection and its own high-water mark can never disagree
    /// about which events have been applied (spec.md §4.2).
    pub fn apply_event(&mut self, record: &thrum_core::EventRecord) -> Result<(), StorageError> {
        let sequence = record.sequence;
        self.with_transaction(|tx| {
            crate::projector::apply(tx, &record.event, record.timestamp)?;
            tx.execute(
                "INSERT INTO store_meta (key, value) VALUES ('processed_seq', ?1)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                rusqlite::params![sequence.to_string()],
            )?;
            Ok(())
        })
    }

    /// The sequence of the last event this store has applied, recovered from
    /// `store_meta` — the real high-water mark a caller must pass to
    /// `EventLog::open`/`entries_after` before replaying, so a restart against
    /// an already-populated store never re-applies events it has seen
    /// (spec.md §4.2; a fresh store has none recorded and returns 0).
    pub fn processed_seq(&self) -> Result<u64, StorageError> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM store_meta WHERE key = 'processed_seq'", [], |r| r.get(0))
            .optional()?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }
}

#[cfg(test)]
#[path = "../store_tests.rs"]
mod tests;
