// SPDX-License-Identifier: MIT

//! `thread.*` (spec.md §3 "Thread").

use serde::{Deserialize, Serialize};
use thrum_core::{AgentId, Event, ThreadId, ThrumError};

use super::{parse, to_json, HandlerContext, HandlerResult};

#[derive(Deserialize)]
struct CreateParams {
    created_by: String,
    #[serde(default)]
    title: Option<String>,
}

pub fn create(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: CreateParams = parse(params)?;
    let created_by = AgentId::from_string(&p.created_by);

    let exists = ctx.state.read(|s| s.get_agent(&created_by))?.is_some();
    if !exists {
        return Err(ThrumError::NotFound(format!("agent {} is not registered", p.created_by)));
    }

    let thread_id = ThreadId::new();
    ctx.state.write(|s| s.commit(Event::ThreadCreate { thread_id: thread_id.clone(), created_by, title: p.title }))?;

    let thread = ctx.state.read(|s| s.get_thread(&thread_id))?.ok_or_else(|| ThrumError::Internal("thread vanished after create".into()))?;
    to_json(thread_with_stats(ctx, thread)?)
}

#[derive(Serialize)]
struct ThreadView {
    thread_id: ThreadId,
    created_by: AgentId,
    title: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    reply_count: u64,
    last_reply_at: Option<chrono::DateTime<chrono::Utc>>,
    last_reply_agent_id: Option<AgentId>,
}

fn thread_with_stats(ctx: &HandlerContext, row: thrum_storage::ThreadRow) -> Result<ThreadView, ThrumError> {
    let (reply_count, last_reply_at, last_reply_agent_id) = ctx.state.read(|s| s.thread_reply_stats(&row.thread_id))?;
    Ok(ThreadView {
        thread_id: row.thread_id,
        created_by: row.created_by,
        title: row.title,
        created_at: row.created_at,
        reply_count,
        last_reply_at,
        last_reply_agent_id,
    })
}

pub fn list(ctx: &HandlerContext, _params: Option<serde_json::Value>) -> HandlerResult {
    let rows = ctx.state.read(|s| s.list_threads())?;
    let views: Result<Vec<_>, ThrumError> = rows.into_iter().map(|row| thread_with_stats(ctx, row)).collect();
    to_json(views?)
}

#[derive(Deserialize)]
struct ThreadIdParams {
    thread_id: String,
}

pub fn get(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: ThreadIdParams = parse(params)?;
    let thread_id = ThreadId::from_string(&p.thread_id);
    let row = ctx.state.read(|s| s.get_thread(&thread_id))?.ok_or_else(|| ThrumError::NotFound(format!("thread {} does not exist", p.thread_id)))?;
    to_json(thread_with_stats(ctx, row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatcher::Registry;
    use crate::state::StateLock;
    use std::sync::Arc;
    use std::time::Instant;
    use thrum_core::event::{AgentRegisterPayload, AgentRegisterReason};

    fn fresh_ctx() -> HandlerContext {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().to_path_buf())).unwrap();
        std::mem::forget(dir);
        let state = StateLock::open(&config, "test-daemon").unwrap();
        HandlerContext { state, registry: Registry::new(), config: Arc::new(config), start_time: Instant::now(), transport: super::super::TransportKind::Unix }
    }

    fn register(ctx: &HandlerContext, agent_id: &str) {
        ctx.state
            .write(|s| {
                s.commit(Event::AgentRegister(AgentRegisterPayload {
                    agent_id: AgentId::from_string(agent_id),
                    role: "implementer".into(),
                    module: "core".into(),
                    display: None,
                    hostname: None,
                    reason: AgentRegisterReason::Normal,
                }))
            })
            .unwrap();
    }

    #[test]
    fn creating_a_thread_for_an_unregistered_agent_fails() {
        let ctx = fresh_ctx();
        let err = create(&ctx, Some(serde_json::json!({"created_by": "agent:nobody:core:000000000000"}))).unwrap_err();
        assert!(matches!(err, ThrumError::NotFound(_)));
    }

    #[test]
    fn a_fresh_thread_has_no_replies() {
        let ctx = fresh_ctx();
        register(&ctx, "agent:implementer:core:111111111111");
        let created = create(&ctx, Some(serde_json::json!({"created_by": "agent:implementer:core:111111111111", "title": "design review"}))).unwrap();
        assert_eq!(created["reply_count"], serde_json::json!(0));
        assert_eq!(created["title"], serde_json::json!("design review"));
    }

    #[test]
    fn getting_a_nonexistent_thread_is_not_found() {
        let ctx = fresh_ctx();
        let err = get(&ctx, Some(serde_json::json!({"thread_id": "thrd_doesnotexist"}))).unwrap_err();
        assert!(matches!(err, ThrumError::NotFound(_)));
    }
}
