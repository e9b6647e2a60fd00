// SPDX-License-Identifier: MIT

//! `health` (spec.md §4.8): a liveness probe, not an RPC method group of its
//! own — deliberately exempt from any transport or auth restriction.

use serde::Serialize;

use super::{to_json, HandlerContext, HandlerResult};

#[derive(Serialize)]
struct HealthView {
    status: &'static str,
    uptime_seconds: u64,
    schema_version: i64,
    agent_count: usize,
    open_session_count: usize,
}

pub fn health(ctx: &HandlerContext, _params: Option<serde_json::Value>) -> HandlerResult {
    let agent_count = ctx.state.read(|s| s.list_agents())?.len();
    let open_session_count = ctx.state.read(|s| s.list_open_sessions())?.len();

    to_json(HealthView {
        status: "ok",
        uptime_seconds: ctx.start_time.elapsed().as_secs(),
        schema_version: thrum_storage::SCHEMA_VERSION,
        agent_count,
        open_session_count,
    })
}
