// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! thrum-storage: durable event log plus the derived relational projection.
//!
//! Two pieces live here, kept deliberately separate:
//!
//! - [`event_log::EventLog`] — the append-only JSONL record of every event
//!   that has ever happened, the single source of truth.
//! - [`store::Store`] — a SQLite-backed projection of that log, rebuilt by
//!   replay and queried for everything the RPC surface needs (inbox
//!   pagination, group membership, subscription snapshots). `Store` itself
//!   is a thin, honest wrapper around SQL with no event-sourcing awareness;
//!   [`projector::apply`] is the single writer that turns a logged event into
//!   the row mutations `Store`'s entity submodules expose.

pub mod errors;
pub mod event_log;
pub mod projector;
pub mod schema;
pub mod store;

pub use errors::StorageError;
pub use event_log::{EventLog, LogEntry};
pub use schema::SCHEMA_VERSION;
pub use store::{InboxPage, ListMessagesFilter, MessageRow, SortOrder, Store, ThreadIdFilter, ThreadRow};
