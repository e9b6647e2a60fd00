// SPDX-License-Identifier: MIT

//! `user.*` (spec.md §3 "Identities": `user:<username>`, §4.8 "Transport":
//! `user.register` is WebSocket-only, gated centrally in `dispatch`).

use serde::Deserialize;
use thrum_core::event::{AgentRegisterPayload, AgentRegisterReason, SessionStartPayload};
use thrum_core::{user_id, Event, SessionId, ThrumError};

use super::{parse, to_json, HandlerContext, HandlerResult};

const USER_ROLE: &str = "user";
const USER_MODULE: &str = "human";

#[derive(Deserialize)]
struct IdentifyParams {
    username: String,
}

/// Resolves a username to its stable `user:<username>` id without
/// registering anything — lets a client learn its own identity, or check
/// whether it has registered before, prior to calling `user.register`.
pub fn identify(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: IdentifyParams = parse(params)?;
    if !thrum_core::is_valid_name(&p.username) {
        return Err(ThrumError::Validation(format!("invalid username: {}", p.username)));
    }

    let agent_id = user_id(&p.username);
    let existing = ctx.state.read(|s| s.get_agent(&agent_id))?;
    to_json(serde_json::json!({
        "user_id": agent_id.as_str(),
        "registered": existing.is_some(),
    }))
}

#[derive(Deserialize)]
struct RegisterParams {
    username: String,
    #[serde(default)]
    display: Option<String>,
}

/// Registers (idempotently) the agent row for a human user and starts a
/// session for it. The caller's WebSocket connection registers the returned
/// `session_id` with the push dispatcher so `notify.*` frames can reach it.
pub fn register(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: RegisterParams = parse(params)?;
    if !thrum_core::is_valid_name(&p.username) {
        return Err(ThrumError::Validation(format!("invalid username: {}", p.username)));
    }

    let agent_id = user_id(&p.username);
    let session_id = SessionId::new();

    ctx.state.write(|s| {
        s.commit(Event::AgentRegister(AgentRegisterPayload {
            agent_id: agent_id.clone(),
            role: USER_ROLE.into(),
            module: USER_MODULE.into(),
            display: p.display.clone(),
            hostname: None,
            reason: AgentRegisterReason::Normal,
        }))?;
        s.commit(Event::SessionStart(SessionStartPayload { session_id: session_id.clone(), agent_id: agent_id.clone() }))
    })?;

    let agent = ctx.state.read(|s| s.get_agent(&agent_id))?.ok_or_else(|| ThrumError::Internal("user vanished after registration".into()))?;
    to_json(serde_json::json!({ "agent": agent, "session_id": session_id.as_str() }))
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
        HandlerContext { state, registry: Registry::new(), config: Arc::new(config), start_time: Instant::now(), transport: super::super::TransportKind::WebSocket }
    }

    #[test]
    fn identify_reports_unregistered_before_register_is_called() {
        let ctx = fresh_ctx();
        let identified = identify(&ctx, Some(serde_json::json!({"username": "alice"}))).unwrap();
        assert_eq!(identified["registered"], serde_json::json!(false));
        assert_eq!(identified["user_id"], serde_json::json!("user:alice"));
    }

    #[test]
    fn register_is_idempotent_and_starts_a_fresh_session_each_time() {
        let ctx = fresh_ctx();
        let first = register(&ctx, Some(serde_json::json!({"username": "alice"}))).unwrap();
        let second = register(&ctx, Some(serde_json::json!({"username": "alice"}))).unwrap();
        assert_ne!(first["session_id"], second["session_id"]);

        let identified = identify(&ctx, Some(serde_json::json!({"username": "alice"}))).unwrap();
        assert_eq!(identified["registered"], serde_json::json!(true));
    }
}
