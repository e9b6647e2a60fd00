// SPDX-License-Identifier: MIT

use tempfile::tempdir;
use thrum_core::{AgentId, Event, EventId};

use super::*;

fn test_event() -> Event {
    Event::AgentCleanup { agent_id: AgentId::from_string("agent:a:b:cccccccccccc") }
}

#[test]
fn open_creates_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let log = EventLog::open(&path, 0).unwrap();
    assert!(path.exists());
    assert_eq!(log.write_seq(), 0);
    assert_eq!(log.processed_seq(), 0);
}

#[test]
fn append_assigns_dense_sequences() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let mut log = EventLog::open(&path, 0).unwrap();

    let seq1 = log.append_event(EventId::new(), chrono::Utc::now(), "d1", test_event()).unwrap();
    let seq2 = log.append_event(EventId::new(), chrono::Utc::now(), "d1", test_event()).unwrap();

    assert_eq!(seq1, 1);
    assert_eq!(seq2, 2);
}

#[test]
fn next_unprocessed_advances_with_mark_processed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let mut log = EventLog::open(&path, 0).unwrap();

    log.append_event(EventId::new(), chrono::Utc::now(), "d1", test_event()).unwrap();
    log.append_event(EventId::new(), chrono::Utc::now(), "d1", test_event()).unwrap();
    log.flush().unwrap();

    let entry1 = log.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry1.sequence, 1);
    log.mark_processed(entry1.sequence);

    let entry2 = log.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry2.sequence, 2);
    log.mark_processed(entry2.sequence);

    assert!(log.next_unprocessed().unwrap().is_none());
}

#[test]
fn reopen_with_processed_seq_skips_already_applied() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    {
        let mut log = EventLog::open(&path, 0).unwrap();
        log.append_event(EventId::new(), chrono::Utc::now(), "d1", test_event()).unwrap();
        log.append_event(EventId::new(), chrono::Utc::now(), "d1", test_event()).unwrap();
        log.append_event(EventId::new(), chrono::Utc::now(), "d1", test_event()).unwrap();
        log.flush().unwrap();
    }

    let log = EventLog::open(&path, 2).unwrap();
    let entries = log.entries_after(0).unwrap();
    assert_eq!(entries.len(), 3);

    let entry = log.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry.sequence, 3);
}

#[test]
fn truncated_tail_is_ignored_on_reopen() {
    use std::io::Write as _;

    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    {
        let mut log = EventLog::open(&path, 0).unwrap();
        log.append_event(EventId::new(), chrono::Utc::now(), "d1", test_event()).unwrap();
        log.flush().unwrap();
    }
    {
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"{\"incomplete\n").unwrap();
    }

    let log = EventLog::open(&path, 0).unwrap();
    assert_eq!(log.write_seq(), 1);
}

#[test]
fn entries_after_filters_by_sequence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let mut log = EventLog::open(&path, 0).unwrap();

    log.append_event(EventId::new(), chrono::Utc::now(), "d1", test_event()).unwrap();
    log.append_event(EventId::new(), chrono::Utc::now(), "d1", test_event()).unwrap();
    log.append_event(EventId::new(), chrono::Utc::now(), "d1", test_event()).unwrap();
    log.flush().unwrap();

    let entries = log.entries_after(1).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].sequence, 2);
    assert_eq!(entries[1].sequence, 3);
}
