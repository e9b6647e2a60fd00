// SPDX-License-Identifier: MIT

//! `sync.*` (spec.md §1, §4.8): the core-facing contract for an external
//! `SyncTransport` — "deliver a batch of events for replay" — not the mesh
//! transport itself, which stays out of scope.
//!
//! Gated behind `THRUM_PEER_TOKEN` regardless of which transport the
//! request arrived on (`dispatch` checks `peer_token_valid` before routing
//! here at all, spec.md §6).

use serde::{Deserialize, Serialize};
use thrum_core::{EventRecord, ThrumError};
use thrum_storage::EventLog;

use super::{parse, to_json, HandlerContext, HandlerResult};

const DEFAULT_PULL_LIMIT: usize = 500;

/// Checked centrally by `dispatch` before any `sync.*` handler runs. Reads
/// the shared secret from the environment directly (rather than `ctx`,
/// which isn't available at that call site) so it stays in lockstep with
/// `Config::load`'s own `THRUM_PEER_TOKEN` lookup.
pub fn peer_token_valid(params: Option<&serde_json::Value>) -> bool {
    let Ok(expected) = std::env::var("THRUM_PEER_TOKEN") else {
        return false;
    };
    let presented = params.and_then(|v| v.get("peer_token")).and_then(|v| v.as_str());
    presented == Some(expected.as_str())
}

#[derive(Deserialize, Default)]
struct PullParams {
    #[serde(default)]
    after: u64,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct PullResult {
    events: Vec<EventRecord>,
    next_seq: u64,
    more: bool,
}

/// Tails the log from an independent read handle (spec.md §5: readers never
/// take the write lock), capped at `limit` entries per call.
pub fn pull(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: PullParams = parse(params)?;
    let limit = p.limit.unwrap_or(DEFAULT_PULL_LIMIT).max(1);

    let log = EventLog::open(ctx.state.event_log_path(), 0).map_err(|e| ThrumError::Internal(e.to_string()))?;
    let mut entries = log.entries_after(p.after).map_err(|e| ThrumError::Internal(e.to_string()))?;

    let more = entries.len() > limit;
    entries.truncate(limit);
    let next_seq = entries.last().map(|e| e.sequence).unwrap_or(p.after);
    let events = entries.into_iter().map(|e| e.record).collect();

    to_json(PullResult { events, next_seq, more })
}

#[derive(Serialize)]
struct PeerInfo {
    schema_version: i64,
    head_sequence: u64,
    legacy_broadcast_enabled: bool,
}

pub fn peer_info(ctx: &HandlerContext, _params: Option<serde_json::Value>) -> HandlerResult {
    let log = EventLog::open(ctx.state.event_log_path(), 0).map_err(|e| ThrumError::Internal(e.to_string()))?;
    to_json(PeerInfo {
        schema_version: thrum_storage::SCHEMA_VERSION,
        head_sequence: log.write_seq(),
        legacy_broadcast_enabled: ctx.config.legacy_broadcast_enabled,
    })
}

#[derive(Deserialize)]
struct NotifyParams {
    events: Vec<EventRecord>,
}

#[derive(Serialize)]
struct NotifyResult {
    applied: usize,
    head_sequence: u64,
}

/// Relays a peer's events into the local log and store, preserving each
/// record's original `event_id`/`timestamp`/`origin_daemon` — only
/// `sequence` is reassigned, since sequences are local to each daemon's log
/// (spec.md §4.1).
pub fn notify(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: NotifyParams = parse(params)?;
    let mut head_sequence = 0;
    for record in p.events.iter() {
        head_sequence = ctx.state.write(|s| s.ingest(record.clone()))?;
    }
    to_json(NotifyResult { applied: p.events.len(), head_sequence })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_check_rejects_when_env_var_is_unset() {
        std::env::remove_var("THRUM_PEER_TOKEN");
        assert!(!peer_token_valid(Some(&serde_json::json!({"peer_token": "whatever"}))));
    }

    #[test]
    fn token_check_requires_an_exact_match() {
        std::env::set_var("THRUM_PEER_TOKEN", "s3cret");
        assert!(peer_token_valid(Some(&serde_json::json!({"peer_token": "s3cret"}))));
        assert!(!peer_token_valid(Some(&serde_json::json!({"peer_token": "wrong"}))));
        std::env::remove_var("THRUM_PEER_TOKEN");
    }
}
