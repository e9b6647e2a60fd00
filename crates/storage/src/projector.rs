// SPDX-License-Identifier: MIT

//! The projector: the single writer that turns a logged [`Event`] into
//! relational state (spec.md §4.2).
//!
//! `apply` runs inside the `rusqlite::Transaction` the caller already opened
//! (see `Store::apply_event`) — it is the only code in the workspace allowed
//! to call the `store::{agents,groups,...}` submodule functions directly
//! rather than through `Store`'s public per-entity methods, because those
//! methods operate on `&Connection` and a `Transaction` derefs to one.
//!
//! Per-event effects mirror spec.md §4.2 one-for-one. Authorization and
//! validation (unknown recipients, non-author edits, everyone-group
//! immutability, group-as-member rejection) happen in the caller (the
//! daemon's handlers) before the event is ever built — by the time an event
//! reaches here it is assumed valid, so `apply` is infallible except for
//! genuine storage failures.

use chrono::{DateTime, Utc};
use rusqlite::Transaction;
use thrum_core::{
    Agent, AgentKind, Event, Group, GroupMember, Message, MessageEdit, Session,
};

use crate::errors::StorageError;
use crate::store::{agents, groups, messages, sessions, subscriptions, threads, work_contexts};

pub fn apply(tx: &Transaction, event: &Event, at: DateTime<Utc>) -> Result<(), StorageError> {
    match event {
        Event::AgentRegister(payload) => apply_agent_register(tx, payload, at),

        Event::AgentCleanup { agent_id } => {
            sessions::close_open_for_agent(tx, agent_id, at)?;
            agents::delete(tx, agent_id)
        }

        Event::SessionStart(payload) => {
            sessions::close_open_for_agent(tx, &payload.agent_id, at)?;
            sessions::insert(
                tx,
                &Session {
                    session_id: payload.session_id.clone(),
                    agent_id: payload.agent_id.clone(),
                    started_at: at,
                    ended_at: None,
                    end_reason: None,
                    last_seen_at: at,
                },
            )
        }

        Event::SessionEnd { session_id, reason } => sessions::end(tx, session_id, *reason, at),

        Event::SessionHeartbeat(payload) => {
            sessions::touch_heartbeat(tx, &payload.session_id, at)?;
            agents::touch_last_seen(tx, &payload.agent_id, at)
            // Scope/ref add/remove sets and the worktree-triggered extraction
            // are handled by the daemon's session lifecycle, not the
            // projector: spec.md §3 defines no session-scopes table, and the
            // extraction result lands in `agent_work_contexts` via a direct
            // best-effort upsert rather than a logged event (see DESIGN.md).
        }

        Event::SessionSetIntent { session_id, agent_id, intent } => {
            work_contexts::set_intent(tx, session_id, agent_id, intent, at)
        }

        Event::SessionSetTask { session_id, agent_id, task } => {
            work_contexts::set_task(tx, session_id, agent_id, task, at)
        }

        Event::MessageCreate(payload) => messages::insert(
            tx,
            &Message {
                message_id: payload.message_id.clone(),
                thread_id: payload.thread_id.clone(),
                agent_id: payload.agent_id.clone(),
                session_id: payload.session_id.clone(),
                created_at: at,
                updated_at: None,
                deleted: false,
                deleted_at: None,
                delete_reason: None,
                body_format: payload.body_format,
                body_content: payload.body_content.clone(),
                body_structured: payload.body_structured.clone(),
                authored_by: payload.authored_by.clone(),
                disclosed: payload.disclosed,
                scopes: payload.scopes.clone(),
                refs: payload.refs.clone(),
            },
        ),

        Event::MessageEdit(payload) => {
            let version = messages::next_edit_version(tx, &payload.message_id)?;
            messages::append_edit(
                tx,
                &MessageEdit {
                    message_id: payload.message_id.clone(),
                    version,
                    body_format: payload.body_format,
                    body_content: payload.body_content.clone(),
                    body_structured: payload.body_structured.clone(),
                    edited_at: at,
                },
            )
        }

        Event::MessageDelete { message_id, reason } => {
            messages::soft_delete(tx, message_id, reason.as_deref(), at)
        }

        Event::MessageRead { message_id, session_id, agent_id } => {
            messages::mark_read(tx, message_id, session_id, agent_id, at).map(|_| ())
        }

        Event::GroupCreate(payload) => groups::create(
            tx,
            &Group {
                group_id: payload.group_id.clone(),
                name: payload.name.clone(),
                description: payload.description.clone(),
                created_at: at,
                created_by: payload.created_by.clone(),
            },
        ),

        Event::GroupDelete { group_id } => groups::delete(tx, group_id),

        Event::GroupMemberAdd(payload) => {
            groups::add_member(tx, &payload.group_id, &payload.member, at, payload.added_by.as_ref())
        }

        Event::GroupMemberRemove(payload) => groups::remove_member(tx, &payload.group_id, &payload.member),

        Event::ThreadCreate { thread_id, created_by, title } => threads::create(
            tx,
            &threads::ThreadRow {
                thread_id: thread_id.clone(),
                created_by: created_by.clone(),
                title: title.clone(),
                created_at: at,
            },
        ),

        Event::SubscriptionAdd(payload) => subscriptions::add(
            tx,
            &payload.subscription_id,
            &thrum_core::Subscription {
                session_id: payload.session_id.clone(),
                scope: payload.scope.clone(),
                mention_role: payload.mention_role.clone(),
                all: payload.all,
                created_at: at,
            },
        ),

        Event::SubscriptionRemove { subscription_id, .. } => subscriptions::remove(tx, subscription_id),
    }
}

/// `agent.register`'s conflict resolution (spec.md §3 "Agent", §4.2): upsert
/// is idempotent for the same `agent_id`; a different `agent_id` claiming the
/// same `(role, module)` is resolved by `reason` (`Force` evicts the prior
/// row, `ReRegister` replaces it in place — both are an evict-then-insert at
/// the storage layer since `agent_id` is the primary key; they differ only in
/// which RPC path produced the event). Then auto-creates the role group.
fn apply_agent_register(
    tx: &Transaction,
    payload: &thrum_core::AgentRegisterPayload,
    at: DateTime<Utc>,
) -> Result<(), StorageError> {
    use thrum_core::AgentRegisterReason;

    if matches!(payload.reason, AgentRegisterReason::Force | AgentRegisterReason::ReRegister) {
        if let Some(existing) = agents::get_by_role_module(tx, &payload.role, &payload.module)? {
            if existing.agent_id != payload.agent_id {
                agents::delete_by_role_module(tx, &payload.role, &payload.module)?;
            }
        }
    }

    agents::upsert(
        tx,
        &Agent {
            agent_id: payload.agent_id.clone(),
            kind: if payload.agent_id.as_str().starts_with("user:") { AgentKind::User } else { AgentKind::Agent },
            role: payload.role.clone(),
            module: payload.module.clone(),
            display: payload.display.clone(),
            hostname: payload.hostname.clone(),
            registered_at: at,
            last_seen_at: Some(at),
        },
    )?;

    if !payload.role.is_empty() && !agents::role_group_exists(tx, &payload.role)? {
        let group_id = thrum_core::role_group_id(&payload.role);
        groups::create(
            tx,
            &Group {
                group_id: group_id.clone(),
                name: payload.role.clone(),
                description: Some(format!("auto-created role group for {}", payload.role)),
                created_at: at,
                created_by: payload.agent_id.clone(),
            },
        )?;
        groups::add_member(
            tx,
            &group_id,
            &GroupMember::Role { member_value: payload.role.clone() },
            at,
            None,
        )?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "projector_tests.rs"]
mod tests;
