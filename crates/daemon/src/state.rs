// SPDX-License-Identifier: MIT

//! Single-writer, many-reader state (spec.md §5).
//!
//! Grounded in the teacher's `Arc<Mutex<MaterializedState>>` (`lifecycle/mod.rs`):
//! the lock is held synchronously, never across an `.await`, because
//! `rusqlite::Connection` and file I/O are blocking anyway. The difference
//! from the teacher is the lock type: the teacher's job engine is a single
//! read-modify-write loop so a plain `Mutex` is enough, but thrum's inbox
//! reads (`message.list`, `group.members`, ...) vastly outnumber writes, so
//! this uses `parking_lot::RwLock` to let readers run concurrently while
//! still serializing writers through one path.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use thrum_core::EventId;
use thrum_storage::{EventLog, Store};

use crate::config::Config;

/// Everything a write needs: the durable log and its relational projection,
/// always mutated together inside one call to [`StateLock::write`].
pub struct State {
    pub event_log: EventLog,
    pub store: Store,
    origin_daemon: String,
}

impl State {
    /// Appends `event`, flushes the log to disk, then applies it to the
    /// `Store` — durability before projection, matching the order
    /// `EventLog`'s doc comment promises callers (spec.md §4.1-4.2).
    pub fn commit(&mut self, event: thrum_core::Event) -> Result<u64, thrum_storage::StorageError> {
        let record = thrum_core::EventRecord {
            event_id: EventId::new(),
            sequence: 0,
            timestamp: Utc::now(),
            origin_daemon: self.origin_daemon.clone(),
            event,
        };
        self.ingest(record)
    }

    /// Appends and applies a record whose `event_id`/`timestamp`/
    /// `origin_daemon` were assigned elsewhere — a peer daemon's event,
    /// relayed verbatim by `sync.notify`. Only `sequence` is reassigned,
    /// same as any other append (spec.md §4.1: sequences are local to each
    /// log, never carried over from the originating daemon).
    pub fn ingest(&mut self, mut record: thrum_core::EventRecord) -> Result<u64, thrum_storage::StorageError> {
        let sequence = self.event_log.append(record.clone())?;
        self.event_log.flush()?;
        record.sequence = sequence;
        self.store.apply_event(&record)?;
        self.event_log.mark_processed(sequence);
        Ok(sequence)
    }
}

/// Shared handle to daemon state. Cloning is cheap (an `Arc` bump); every
/// transport connection holds one.
#[derive(Clone)]
pub struct StateLock {
    inner: Arc<RwLock<State>>,
}

impl StateLock {
    /// Opens the `EventLog` and `Store`, replays any entries the `Store`
    /// hasn't seen yet, and returns the ready-to-serve lock. Does not touch
    /// the network — `lifecycle::startup` binds listeners only after this
    /// returns successfully.
    pub fn open(config: &Config, origin_daemon: impl Into<String>) -> Result<Self, thrum_storage::StorageError> {
        let mut store = Store::open(&config.db_path)?;
        // The Store persists its own high-water mark (`processed_seq`,
        // advanced in the same transaction as every projection write), so a
        // restart against an already-populated db_path only replays events
        // it hasn't seen yet — a fresh store has none recorded and this is 0.
        let processed_seq = store.processed_seq()?;
        let mut event_log = EventLog::open(&config.event_log_path, processed_seq)?;

        for entry in event_log.entries_after(processed_seq)? {
            store.apply_event(&entry.record)?;
            event_log.mark_processed(entry.sequence);
        }

        Ok(Self { inner: Arc::new(RwLock::new(State { event_log, store, origin_daemon: origin_daemon.into() })) })
    }

    /// Runs `f` with exclusive access, for any operation that appends to the
    /// log and/or mutates the store. `f` must not block on I/O unrelated to
    /// the state itself (no git subprocesses, no network calls) — those run
    /// before or after the lock is held, per spec.md §5's shared-resource
    /// policy.
    pub fn write<T>(&self, f: impl FnOnce(&mut State) -> Result<T, thrum_storage::StorageError>) -> Result<T, thrum_storage::StorageError> {
        let mut guard = self.inner.write();
        f(&mut guard)
    }

    /// Runs `f` with shared (read-only) access to the `Store`. Multiple
    /// readers may run concurrently; a reader never blocks a writer that
    /// hasn't started, but does wait out one already in progress.
    pub fn read<T>(&self, f: impl FnOnce(&Store) -> Result<T, thrum_storage::StorageError>) -> Result<T, thrum_storage::StorageError> {
        let guard = self.inner.read();
        f(&guard.store)
    }

    /// Path to the canonical event log, for `sync.pull`/`sync.peer_info` to
    /// open their own independent read handle (spec.md §5: readers never
    /// take the write lock).
    pub fn event_log_path(&self) -> std::path::PathBuf {
        self.inner.read().event_log.path().to_path_buf()
    }
}
