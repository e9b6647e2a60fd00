// SPDX-License-Identifier: MIT

//! `agent.*` (spec.md §3 "Agent", §4.2 `agent.register` conflict resolution).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thrum_core::event::{AgentRegisterPayload, AgentRegisterReason};
use thrum_core::{Agent, AgentId, Event, ThrumError};

use super::{parse, to_json, HandlerContext, HandlerResult};
use crate::identities;

#[derive(Deserialize)]
struct RegisterParams {
    role: String,
    module: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    force: bool,
    #[serde(default)]
    re_register: bool,
}

pub fn register(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: RegisterParams = parse(params)?;

    if let Some(name) = &p.name {
        if !thrum_core::is_valid_name(name) {
            return Err(ThrumError::Validation(format!("invalid agent name: {name}")));
        }
        if name == &p.role {
            return Err(ThrumError::Validation("agent name must not equal its own role".into()));
        }
    }

    let repo_id = ctx.config.repo_root.to_string_lossy().to_string();
    let agent_id = thrum_core::derive_agent_id(&repo_id, &p.role, &p.module, p.name.as_deref());

    let existing_same_id = ctx.state.read(|s| s.get_agent(&agent_id))?;
    let reason = if existing_same_id.is_some() {
        AgentRegisterReason::Normal
    } else {
        let existing_role_module = ctx.state.read(|s| s.get_agent_by_role_module(&p.role, &p.module))?;
        match existing_role_module {
            Some(other) if other.agent_id != agent_id => {
                if p.force {
                    AgentRegisterReason::Force
                } else if p.re_register {
                    AgentRegisterReason::ReRegister
                } else {
                    return Err(ThrumError::Conflict(format!(
                        "role {} module {} is already claimed by {}; pass force or re_register",
                        p.role, p.module, other.agent_id
                    )));
                }
            }
            _ => AgentRegisterReason::Normal,
        }
    };

    ctx.state.write(|s| {
        s.commit(Event::AgentRegister(AgentRegisterPayload {
            agent_id: agent_id.clone(),
            role: p.role.clone(),
            module: p.module.clone(),
            display: p.display.clone(),
            hostname: p.hostname.clone(),
            reason,
        }))
    })?;

    let agent = ctx.state.read(|s| s.get_agent(&agent_id))?.ok_or_else(|| ThrumError::Internal("agent vanished after registration".into()))?;
    identities::write_identity(&ctx.config.identities_dir, &agent).map_err(|e| ThrumError::Internal(e.to_string()))?;

    to_json(&agent)
}

pub fn list(ctx: &HandlerContext, _params: Option<serde_json::Value>) -> HandlerResult {
    let agents = ctx.state.read(|s| s.list_agents())?;
    to_json(agents)
}

#[derive(Deserialize)]
struct AgentIdParams {
    agent_id: String,
}

pub fn whoami(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: AgentIdParams = parse(params)?;
    let agent_id = AgentId::from_string(&p.agent_id);
    let agent = ctx.state.read(|s| s.get_agent(&agent_id))?.ok_or_else(|| ThrumError::NotFound(format!("agent {} is not registered", p.agent_id)))?;
    to_json(&agent)
}

pub fn list_context(ctx: &HandlerContext, _params: Option<serde_json::Value>) -> HandlerResult {
    let names = crate::context_files::list_context_agents(&ctx.config.context_dir).map_err(|e| ThrumError::Internal(e.to_string()))?;
    to_json(names)
}

#[derive(Serialize)]
struct DeleteResult {
    deleted: bool,
}

pub fn delete(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: AgentIdParams = parse(params)?;
    let agent_id = AgentId::from_string(&p.agent_id);

    let exists = ctx.state.read(|s| s.get_agent(&agent_id))?.is_some();
    if !exists {
        return Err(ThrumError::NotFound(format!("agent {} is not registered", p.agent_id)));
    }

    ctx.state.write(|s| s.commit(Event::AgentCleanup { agent_id: agent_id.clone() }))?;
    identities::remove_identity(&ctx.config.identities_dir, agent_id.as_str()).map_err(|e| ThrumError::Internal(e.to_string()))?;

    to_json(DeleteResult { deleted: true })
}

#[derive(Deserialize, Default)]
struct CleanupParams {
    #[serde(default)]
    agent_id: Option<String>,
}

#[derive(Serialize)]
struct CleanupResult {
    cleaned: Vec<String>,
}

/// With an explicit `agent_id`, identical to `agent.delete`. Without one,
/// sweeps every agent with no open session whose `last_seen_at` is older
/// than `crash_recovery_idle` (spec.md §6 `crash_recovery_idle`), mirroring
/// the startup crash-recovery sweep but for agents rather than sessions.
pub fn cleanup(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: CleanupParams = parse(params)?;
    if let Some(agent_id) = p.agent_id {
        return delete(ctx, Some(serde_json::json!({ "agent_id": agent_id })));
    }

    let now = Utc::now();
    let threshold = ctx.config.crash_recovery_idle;
    let agents = ctx.state.read(|s| s.list_agents())?;

    let mut cleaned = Vec::new();
    for agent in agents {
        let open_sessions = ctx.state.read(|s| s.list_sessions_for_agent(&agent.agent_id))?;
        let has_open = open_sessions.iter().any(|sess| sess.is_active());
        if has_open {
            continue;
        }
        let stale = agent.last_seen_at.map(|seen| now.signed_duration_since(seen).to_std().map(|d| d >= threshold).unwrap_or(false)).unwrap_or(false);
        if !stale {
            continue;
        }
        ctx.state.write(|s| s.commit(Event::AgentCleanup { agent_id: agent.agent_id.clone() }))?;
        identities::remove_identity(&ctx.config.identities_dir, agent.agent_id.as_str()).map_err(|e| ThrumError::Internal(e.to_string()))?;
        cleaned.push(agent.agent_id.as_str().to_string());
    }

    to_json(CleanupResult { cleaned })
}
