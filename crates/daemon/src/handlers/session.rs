// SPDX-License-Identifier: MIT

//! `session.*` (spec.md §3 "Session", §4.7 "SessionLifecycle").

use chrono::Utc;
use serde::Deserialize;
use thrum_core::event::{SessionHeartbeatPayload, SessionStartPayload};
use thrum_core::work_context::{AgentWorkContext, WorkContextExtractor};
use thrum_core::{AgentId, Event, Ref, Scope, SessionId, ThrumError};

use super::{parse, to_json, HandlerContext, HandlerResult};
use crate::work_context_git::GitCliWorkContextExtractor;

#[derive(Deserialize)]
struct StartParams {
    agent_id: String,
}

pub fn start(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: StartParams = parse(params)?;
    let agent_id = AgentId::from_string(&p.agent_id);

    let exists = ctx.state.read(|s| s.get_agent(&agent_id))?.is_some();
    if !exists {
        return Err(ThrumError::NotFound(format!("agent {} is not registered", p.agent_id)));
    }

    let session_id = SessionId::new();
    ctx.state.write(|s| s.commit(Event::SessionStart(SessionStartPayload { session_id: session_id.clone(), agent_id })))?;

    let session = ctx.state.read(|s| s.get_session(&session_id))?.ok_or_else(|| ThrumError::Internal("session vanished after start".into()))?;
    to_json(&session)
}

#[derive(Deserialize)]
struct SessionIdParams {
    session_id: String,
}

fn require_active_session(ctx: &HandlerContext, session_id: &SessionId) -> Result<thrum_core::Session, ThrumError> {
    let session = ctx.state.read(|s| s.get_session(session_id))?.ok_or_else(|| ThrumError::NotFound(format!("session {} does not exist", session_id.as_str())))?;
    if !session.is_active() {
        return Err(ThrumError::StateIllegal(format!("session {} has already ended", session_id.as_str())));
    }
    Ok(session)
}

pub fn end(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: SessionIdParams = parse(params)?;
    let session_id = SessionId::from_string(&p.session_id);
    require_active_session(ctx, &session_id)?;

    ctx.state.write(|s| s.commit(Event::SessionEnd { session_id: session_id.clone(), reason: thrum_core::EndReason::Client }))?;

    let session = ctx.state.read(|s| s.get_session(&session_id))?.ok_or_else(|| ThrumError::Internal("session vanished after end".into()))?;
    to_json(&session)
}

#[derive(Deserialize, Default)]
struct HeartbeatParams {
    session_id: String,
    #[serde(default)]
    add_scopes: Vec<Scope>,
    #[serde(default)]
    remove_scopes: Vec<Scope>,
    #[serde(default)]
    add_refs: Vec<Ref>,
    #[serde(default)]
    remove_refs: Vec<Ref>,
    #[serde(default)]
    worktree_path: Option<String>,
}

pub fn heartbeat(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: HeartbeatParams = parse(params)?;
    let session_id = SessionId::from_string(&p.session_id);
    let session = require_active_session(ctx, &session_id)?;

    ctx.state.write(|s| {
        s.commit(Event::SessionHeartbeat(SessionHeartbeatPayload {
            session_id: session_id.clone(),
            agent_id: session.agent_id.clone(),
            add_scopes: p.add_scopes,
            remove_scopes: p.remove_scopes,
            add_refs: p.add_refs,
            remove_refs: p.remove_refs,
            worktree_path: p.worktree_path.clone(),
        }))
    })?;

    // Extraction runs outside the write lock (spec.md §5 "external processes
    // invoked only outside any lock") and is best-effort: a failure here is
    // logged and swallowed, never surfaced to the caller (spec.md §7).
    if let Some(worktree_path) = &p.worktree_path {
        refresh_work_context(ctx, &session_id, &session.agent_id, worktree_path);
    }

    let session = ctx.state.read(|s| s.get_session(&session_id))?.ok_or_else(|| ThrumError::Internal("session vanished after heartbeat".into()))?;
    to_json(&session)
}

fn refresh_work_context(ctx: &HandlerContext, session_id: &SessionId, agent_id: &AgentId, worktree_path: &str) {
    let extractor = GitCliWorkContextExtractor;
    let snapshot = match extractor.extract(worktree_path) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "work-context extraction failed, skipping");
            return;
        }
    };

    let at = Utc::now();
    let existing = ctx.state.read(|s| s.get_work_context(session_id)).ok().flatten();
    let mut work_context = existing.unwrap_or_else(|| AgentWorkContext::empty(session_id.clone(), agent_id.clone(), at));
    work_context.branch = snapshot.branch;
    work_context.worktree_path = Some(worktree_path.to_string());
    work_context.unmerged_commits = snapshot.unmerged_commits;
    work_context.uncommitted_files = snapshot.uncommitted_files;
    work_context.changed_files = snapshot.changed_files;
    work_context.file_changes = snapshot.file_changes;
    work_context.git_updated_at = at;

    if let Err(e) = ctx.state.write(|s| s.store.upsert_work_context(&work_context)) {
        tracing::warn!(session_id = %session_id, error = %e, "failed to persist refreshed work context");
    }
}

#[derive(Deserialize)]
struct SetIntentParams {
    session_id: String,
    intent: String,
}

pub fn set_intent(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: SetIntentParams = parse(params)?;
    let session_id = SessionId::from_string(&p.session_id);
    let session = require_active_session(ctx, &session_id)?;

    ctx.state.write(|s| s.commit(Event::SessionSetIntent { session_id: session_id.clone(), agent_id: session.agent_id, intent: p.intent }))?;

    let work_context = ctx.state.read(|s| s.get_work_context(&session_id))?;
    to_json(work_context)
}

#[derive(Deserialize)]
struct SetTaskParams {
    session_id: String,
    task: String,
}

pub fn set_task(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: SetTaskParams = parse(params)?;
    let session_id = SessionId::from_string(&p.session_id);
    let session = require_active_session(ctx, &session_id)?;

    ctx.state.write(|s| s.commit(Event::SessionSetTask { session_id: session_id.clone(), agent_id: session.agent_id, task: p.task }))?;

    let work_context = ctx.state.read(|s| s.get_work_context(&session_id))?;
    to_json(work_context)
}

#[derive(Deserialize, Default)]
struct ListParams {
    #[serde(default)]
    agent_id: Option<String>,
}

/// With `agent_id`, every session (open or ended) for that agent. Without
/// one, every currently open session across all agents.
pub fn list(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: ListParams = parse(params)?;
    let sessions = match p.agent_id {
        Some(agent_id) => ctx.state.read(|s| s.list_sessions_for_agent(&AgentId::from_string(&agent_id)))?,
        None => ctx.state.read(|s| s.list_open_sessions())?,
    };
    to_json(sessions)
}
