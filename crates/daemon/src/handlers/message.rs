// SPDX-License-Identifier: MIT

//! `message.*` (spec.md §3 "Message", §4.3 "Router", §4.4 impersonation,
//! §4.5 inbox query).

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thrum_core::{AgentId, BodyFormat, Event, MessageId, Ref, Scope, SessionId, ThreadId, ThrumError};
use thrum_storage::{ListMessagesFilter, SortOrder, ThreadIdFilter};

use super::{parse, to_json, HandlerContext, HandlerResult};
use crate::archive::{self, ArchiveSelector};
use crate::dispatcher;
use crate::impersonation;
use crate::router;

#[derive(Deserialize)]
struct SendParams {
    agent_id: String,
    session_id: String,
    #[serde(default = "default_body_format")]
    body_format: String,
    body_content: String,
    #[serde(default)]
    body_structured: Option<serde_json::Value>,
    #[serde(default)]
    mentions: Vec<String>,
    #[serde(default)]
    reply_to: Option<String>,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    scopes: Vec<Scope>,
    #[serde(default)]
    refs: Vec<Ref>,
    #[serde(default)]
    acting_as: Option<String>,
    #[serde(default)]
    disclose: bool,
}

fn default_body_format() -> String {
    "plain".to_string()
}

#[derive(Serialize)]
struct SendResult {
    message: thrum_core::Message,
    resolved_count: usize,
    warnings: Vec<String>,
}

pub fn send(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: SendParams = parse(params)?;
    let body_format = BodyFormat::from_str(&p.body_format).map_err(ThrumError::Validation)?;

    let caller = AgentId::from_string(&p.agent_id);
    let session_id = SessionId::from_string(&p.session_id);
    let session = ctx.state.read(|s| s.get_session(&session_id))?.ok_or_else(|| ThrumError::NotFound(format!("session {} does not exist", p.session_id)))?;

    let acting_as = p.acting_as.as_ref().map(|a| AgentId::from_string(a));
    let authored = impersonation::resolve_author(&ctx.state, &caller, acting_as.as_ref(), p.disclose)?;

    let routed = router::route(&ctx.state, &p.mentions)?;

    let mut scopes = p.scopes;
    scopes.extend(routed.scopes);
    let mut refs = p.refs;
    refs.extend(routed.refs);

    if let Some(reply_to) = &p.reply_to {
        refs.push(router::route_reply_to(&ctx.state, &MessageId::from_string(reply_to))?);
    }

    let thread_id = match &p.thread_id {
        Some(id) => {
            let thread_id = ThreadId::from_string(id);
            let exists = ctx.state.read(|s| s.get_thread(&thread_id))?.is_some();
            if !exists {
                return Err(ThrumError::Validation(format!("thread {id} does not exist")));
            }
            Some(thread_id)
        }
        None => None,
    };

    let message_id = MessageId::new();
    ctx.state.write(|s| {
        s.commit(Event::MessageCreate(thrum_core::event::MessageCreatePayload {
            message_id: message_id.clone(),
            thread_id: thread_id.clone(),
            agent_id: authored.agent_id.clone(),
            session_id: session.session_id.clone(),
            body_format,
            body_content: p.body_content.clone(),
            body_structured: p.body_structured.clone(),
            authored_by: authored.authored_by.clone(),
            disclosed: authored.disclosed,
            scopes: scopes.clone(),
            refs: refs.clone(),
        }))
    })?;

    let message = ctx.state.read(|s| s.get_message(&message_id))?.ok_or_else(|| ThrumError::Internal("message vanished after send".into()))?;

    // Best-effort: a push failure never rolls back the committed write
    // (spec.md §4.6, §7).
    if let Err(e) = dispatcher::dispatch_for_message(&ctx.state, &ctx.registry, &message) {
        tracing::warn!(message_id = %message_id, error = %e, "subscription fan-out failed");
    }

    to_json(SendResult { message, resolved_count: routed.resolved_count, warnings: routed.warnings })
}

#[derive(Deserialize)]
struct MessageIdParams {
    message_id: String,
}

pub fn get(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: MessageIdParams = parse(params)?;
    let message_id = MessageId::from_string(&p.message_id);
    let message = ctx.state.read(|s| s.get_message(&message_id))?.ok_or_else(|| ThrumError::NotFound(format!("message {} does not exist", p.message_id)))?;
    to_json(message)
}

#[derive(Deserialize, Default)]
struct ListParams {
    #[serde(default)]
    for_agent: Option<String>,
    #[serde(default)]
    for_agent_role: Option<String>,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    sort_by: Option<String>,
    #[serde(default)]
    sort_order: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_page_size")]
    page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

pub fn list(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: ListParams = parse(params)?;

    let sort_order = match p.sort_order.as_deref() {
        Some("desc") => Some(SortOrder::Desc),
        Some("asc") => Some(SortOrder::Asc),
        _ => None,
    };

    let filter = ListMessagesFilter {
        for_agent: p.for_agent,
        for_agent_role: p.for_agent_role,
        thread_id: p.thread_id.map(|id| ThreadIdFilter(ThreadId::from_string(id))),
        sort_by: p.sort_by,
        sort_order,
        page: p.page,
        page_size: p.page_size,
        legacy_broadcast_enabled: ctx.config.legacy_broadcast_enabled,
    };

    let page = ctx.state.read(|s| s.list_inbox(&filter))?;
    to_json(page)
}

#[derive(Deserialize)]
struct EditParams {
    message_id: String,
    editor_agent_id: String,
    #[serde(default = "default_body_format")]
    body_format: String,
    body_content: String,
    #[serde(default)]
    body_structured: Option<serde_json::Value>,
}

pub fn edit(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: EditParams = parse(params)?;
    let message_id = MessageId::from_string(&p.message_id);
    let editor = AgentId::from_string(&p.editor_agent_id);
    let body_format = BodyFormat::from_str(&p.body_format).map_err(ThrumError::Validation)?;

    let existing = ctx.state.read(|s| s.get_message(&message_id))?.ok_or_else(|| ThrumError::NotFound(format!("message {} does not exist", p.message_id)))?;
    if existing.deleted {
        return Err(ThrumError::StateIllegal(format!("message {} has been deleted", p.message_id)));
    }
    if existing.agent_id != editor {
        return Err(ThrumError::Authorization(format!("{} is not the author of message {}", p.editor_agent_id, p.message_id)));
    }

    ctx.state.write(|s| {
        s.commit(Event::MessageEdit(thrum_core::event::MessageEditPayload {
            message_id: message_id.clone(),
            editor_agent_id: editor,
            body_format,
            body_content: p.body_content,
            body_structured: p.body_structured,
        }))
    })?;

    let message = ctx.state.read(|s| s.get_message(&message_id))?.ok_or_else(|| ThrumError::Internal("message vanished after edit".into()))?;
    to_json(message)
}

#[derive(Deserialize)]
struct DeleteParams {
    message_id: String,
    #[serde(default)]
    reason: Option<String>,
}

pub fn delete(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: DeleteParams = parse(params)?;
    let message_id = MessageId::from_string(&p.message_id);

    let existing = ctx.state.read(|s| s.get_message(&message_id))?.ok_or_else(|| ThrumError::NotFound(format!("message {} does not exist", p.message_id)))?;
    if existing.deleted {
        return Err(ThrumError::StateIllegal(format!("message {} is already deleted", p.message_id)));
    }

    ctx.state.write(|s| s.commit(Event::MessageDelete { message_id: message_id.clone(), reason: p.reason }))?;

    let message = ctx.state.read(|s| s.get_message(&message_id))?.ok_or_else(|| ThrumError::Internal("message vanished after delete".into()))?;
    to_json(message)
}

#[derive(Deserialize)]
struct MarkReadParams {
    message_id: String,
    session_id: String,
    agent_id: String,
}

#[derive(Serialize)]
struct MarkReadResult {
    marked: bool,
}

pub fn mark_read(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: MarkReadParams = parse(params)?;
    let message_id = MessageId::from_string(&p.message_id);
    let session_id = SessionId::from_string(&p.session_id);
    let agent_id = AgentId::from_string(&p.agent_id);

    // Non-existent messages are skipped, not errors (spec.md §4.2).
    let marked = ctx.state.write(|s| s.store.mark_message_read(&message_id, &session_id, &agent_id, chrono::Utc::now()))?;
    to_json(MarkReadResult { marked })
}

#[derive(Deserialize)]
struct ArchiveParams {
    #[serde(default)]
    agent_id: Option<String>,
    #[serde(default)]
    scope: Option<Scope>,
}

#[derive(Serialize)]
struct ArchiveResult {
    archived: usize,
}

/// `message.archive` dispatches on whichever one of `agent_id`/`scope` is
/// present (spec.md §9: "behavior when both match ... is defined by
/// semantics of the chosen archive_type only"). Exactly one must be given.
pub fn archive(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: ArchiveParams = parse(params)?;
    let selector = match (p.agent_id, p.scope) {
        (Some(agent_id), None) => ArchiveSelector::ByAgent(AgentId::from_string(&agent_id)),
        (None, Some(scope)) => ArchiveSelector::ByScope(scope),
        (Some(_), Some(_)) => return Err(ThrumError::Validation("message.archive takes exactly one of agent_id or scope, not both".into())),
        (None, None) => return Err(ThrumError::Validation("message.archive requires agent_id or scope".into())),
    };

    let archived = archive::archive(&ctx.state, &ctx.config.archive_dir, selector)?;
    to_json(ArchiveResult { archived })
}

#[derive(Deserialize)]
struct DeleteByScopeParams {
    scope: Scope,
}

#[derive(Serialize)]
struct DeletedResult {
    deleted: usize,
}

pub fn delete_by_scope(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: DeleteByScopeParams = parse(params)?;
    let deleted = ctx.state.write(|s| s.store.delete_messages_by_scope(&p.scope))?;
    to_json(DeletedResult { deleted: deleted.len() })
}

#[derive(Deserialize)]
struct DeleteByAgentParams {
    agent_id: String,
}

/// The single, non-duplicated `message.deleteByAgent` (spec.md §9: the
/// original source's duplicated `HandleDeleteByAgent` declarations collapse
/// to one operation here).
pub fn delete_by_agent(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: DeleteByAgentParams = parse(params)?;
    let agent_id = AgentId::from_string(&p.agent_id);
    let deleted = ctx.state.write(|s| s.store.delete_messages_by_agent(&agent_id))?;
    to_json(DeletedResult { deleted: deleted.len() })
}
