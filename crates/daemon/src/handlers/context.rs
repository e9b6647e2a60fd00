// SPDX-License-Identifier: MIT

//! `context.*`, `preamble.*` (spec.md §6): thin façades over the markdown
//! files in `.thrum/context/`, not routed through the event log at all.

use serde::Deserialize;
use thrum_core::ThrumError;

use super::{parse, to_json, HandlerContext, HandlerResult};
use crate::context_files;

#[derive(Deserialize)]
struct SaveParams {
    agent_id: String,
    content: String,
}

pub fn save(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: SaveParams = parse(params)?;
    context_files::save_context(&ctx.config.context_dir, &p.agent_id, &p.content).map_err(|e| ThrumError::Internal(e.to_string()))?;
    to_json(serde_json::json!({ "saved": true }))
}

#[derive(Deserialize)]
struct AgentIdParams {
    agent_id: String,
}

pub fn show(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: AgentIdParams = parse(params)?;
    let content = context_files::show_context(&ctx.config.context_dir, &p.agent_id).map_err(|e| ThrumError::Internal(e.to_string()))?;
    to_json(serde_json::json!({ "content": content }))
}

pub fn clear(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: AgentIdParams = parse(params)?;
    context_files::clear_context(&ctx.config.context_dir, &p.agent_id).map_err(|e| ThrumError::Internal(e.to_string()))?;
    to_json(serde_json::json!({ "cleared": true }))
}

pub fn save_preamble(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: SaveParams = parse(params)?;
    context_files::save_preamble(&ctx.config.context_dir, &p.agent_id, &p.content).map_err(|e| ThrumError::Internal(e.to_string()))?;
    to_json(serde_json::json!({ "saved": true }))
}

pub fn show_preamble(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: AgentIdParams = parse(params)?;
    let content = context_files::show_preamble(&ctx.config.context_dir, &p.agent_id).map_err(|e| ThrumError::Internal(e.to_string()))?;
    to_json(serde_json::json!({ "content": content }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatcher::Registry;
    use crate::state::StateLock;
    use std::sync::Arc;
    use std::time::Instant;

    fn fresh_ctx() -> HandlerContext {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().to_path_buf())).unwrap();
        std::mem::forget(dir);
        let state = StateLock::open(&config, "test-daemon").unwrap();
        HandlerContext { state, registry: Registry::new(), config: Arc::new(config), start_time: Instant::now(), transport: super::super::TransportKind::Unix }
    }

    #[test]
    fn save_then_show_then_clear_roundtrips_through_the_handlers() {
        let ctx = fresh_ctx();
        save(&ctx, Some(serde_json::json!({"agent_id": "agent:a:b:c", "content": "notes"}))).unwrap();

        let shown = show(&ctx, Some(serde_json::json!({"agent_id": "agent:a:b:c"}))).unwrap();
        assert_eq!(shown["content"], serde_json::json!("notes"));

        clear(&ctx, Some(serde_json::json!({"agent_id": "agent:a:b:c"}))).unwrap();
        let shown = show(&ctx, Some(serde_json::json!({"agent_id": "agent:a:b:c"}))).unwrap();
        assert_eq!(shown["content"], serde_json::Value::Null);
    }

    #[test]
    fn preamble_is_independent_of_context() {
        let ctx = fresh_ctx();
        save_preamble(&ctx, Some(serde_json::json!({"agent_id": "agent:a:b:c", "content": "preamble"}))).unwrap();
        let shown = show(&ctx, Some(serde_json::json!({"agent_id": "agent:a:b:c"}))).unwrap();
        assert_eq!(shown["content"], serde_json::Value::Null);

        let shown_preamble = show_preamble(&ctx, Some(serde_json::json!({"agent_id": "agent:a:b:c"}))).unwrap();
        assert_eq!(shown_preamble["content"], serde_json::json!("preamble"));
    }
}
