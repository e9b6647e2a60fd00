// SPDX-License-Identifier: MIT

//! Append-only JSONL event log (spec.md §4.1).
//!
//! Grounded in the teacher's `Wal` (its `wal.rs` source was filtered from the
//! retrieval pack by size, but `wal_tests.rs` documents the full contract:
//! `open`, `append`, `flush`, `next_unprocessed`, `mark_processed`,
//! `entries_after`, `write_seq`, `processed_seq`, corrupt-tail tolerance on
//! reopen). This reimplements that contract for `thrum_core::EventRecord`
//! instead of the teacher's job-engine `Event`, and drops the engine's
//! `.bak` rotation (this log is replayed in full on every startup — see
//! `lifecycle::startup` — so a truncated tail is simply ignored, never
//! rotated aside).

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thrum_core::{Event, EventId, EventRecord};

use crate::errors::StorageError;

/// One durable line in the log: the `sequence` assigned at append time plus
/// the record itself (which also carries its own `sequence` field, kept in
/// sync — see `append`).
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub sequence: u64,
    pub record: EventRecord,
}

/// Append-only, sequence-numbered JSONL log. One writer at a time is
/// enforced by the caller (`StateLock`, in `thrum-daemon`); `EventLog` itself
/// does no internal locking.
pub struct EventLog {
    path: PathBuf,
    file: File,
    write_seq: u64,
    processed_seq: u64,
}

impl EventLog {
    /// Opens (creating if absent) the log at `path`. `processed_seq` is the
    /// high-water mark recovered from the Store (or 0 for a fresh replay);
    /// `next_unprocessed` will not return entries at or below it.
    ///
    /// Any line after the last fully-formed JSON line is treated as a
    /// truncated tail (e.g. a crash mid-append) and is silently ignored —
    /// the log's `write_seq` reflects only the valid prefix.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).read(true).append(true).open(&path)?;
        let write_seq = Self::scan_last_sequence(&mut file)?;

        Ok(Self { path, file, write_seq, processed_seq })
    }

    fn scan_last_sequence(file: &mut File) -> Result<u64, StorageError> {
        file.seek(SeekFrom::Start(0))?;
        let mut last_seq = 0u64;
        let reader = BufReader::new(&mut *file);
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break, // non-UTF-8 tail: treat as truncated
            };
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<EventRecord>(&line) {
                Ok(record) => last_seq = record.sequence,
                Err(_) => break, // malformed tail (partial write) stops the scan
            }
        }
        file.seek(SeekFrom::End(0))?;
        Ok(last_seq)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    /// Appends one event, assigning it the next sequence number. The caller
    /// must hold the write lock; `EventLog` assumes single-writer discipline.
    /// Does not fsync on every call — see `flush`.
    pub fn append(&mut self, record: EventRecord) -> Result<u64, StorageError> {
        let sequence = self.write_seq + 1;
        let mut record = record;
        record.sequence = sequence;

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;

        self.write_seq = sequence;
        Ok(sequence)
    }

    /// Builds an `EventRecord` from an `Event` payload, assigning it
    /// `sequence` via `append`.
    pub fn append_event(
        &mut self,
        event_id: EventId,
        timestamp: chrono::DateTime<chrono::Utc>,
        origin_daemon: impl Into<String>,
        event: Event,
    ) -> Result<u64, StorageError> {
        let record = EventRecord { event_id, sequence: 0, timestamp, origin_daemon: origin_daemon.into(), event };
        self.append(record)
    }

    /// Durability: fsync the underlying file. Spec.md §4.1 requires appends
    /// be "durable before reply"; handlers call this once per write
    /// transaction after `append`.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Reads the next entry with `sequence > processed_seq`, without
    /// advancing `processed_seq` — the caller marks it processed explicitly
    /// once the projector has applied it.
    pub fn next_unprocessed(&self) -> Result<Option<LogEntry>, StorageError> {
        Ok(self.entries_after(self.processed_seq)?.into_iter().next())
    }

    pub fn mark_processed(&mut self, sequence: u64) {
        if sequence > self.processed_seq {
            self.processed_seq = sequence;
        }
    }

    /// Returns every valid entry with `sequence > after`, in order. Stops
    /// (rather than erroring) at the first malformed or truncated line, so a
    /// crash-truncated tail never blocks replay of the valid prefix.
    pub fn entries_after(&self, after: u64) -> Result<Vec<LogEntry>, StorageError> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut out = Vec::new();

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            if line.is_empty() {
                continue;
            }
            let record: EventRecord = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(_) => break,
            };
            if record.sequence > after {
                out.push(LogEntry { sequence: record.sequence, record });
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
