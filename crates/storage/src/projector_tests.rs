// SPDX-License-Identifier: MIT

use chrono::Utc;
use thrum_core::event::{AgentRegisterPayload, AgentRegisterReason, MessageCreatePayload, SessionStartPayload};
use thrum_core::{AgentId, BodyFormat, Event, GroupMember, MessageId, Ref, Scope, SessionId, ThreadId};

use super::*;
use crate::store::Store;

fn register(agent_id: &str, role: &str, module: &str, reason: AgentRegisterReason) -> Event {
    Event::AgentRegister(AgentRegisterPayload {
        agent_id: AgentId::from_string(agent_id),
        role: role.into(),
        module: module.into(),
        display: None,
        hostname: None,
        reason,
    })
}

#[test]
fn agent_register_auto_creates_role_group_once() {
    let mut store = Store::open_in_memory().unwrap();
    let now = Utc::now();

    store
        .with_transaction(|tx| apply(tx, &register("agent:implementer:core:abc123456789", "implementer", "core", AgentRegisterReason::Normal), now))
        .unwrap();
    store
        .with_transaction(|tx| apply(tx, &register("agent:implementer:wire:def987654321", "implementer", "wire", AgentRegisterReason::Normal), now))
        .unwrap();

    let group = store.get_group_by_name("implementer").unwrap().expect("role group created");
    let members = store.group_members(&group.group_id).unwrap();
    assert_eq!(members.len(), 1, "second registration under the same role must not duplicate the group");
    assert!(matches!(&members[0], GroupMember::Role { member_value } if member_value == "implementer"));
}

#[test]
fn agent_register_force_evicts_prior_occupant_of_role_module() {
    let mut store = Store::open_in_memory().unwrap();
    let now = Utc::now();

    store
        .with_transaction(|tx| apply(tx, &register("agent:implementer:core:111111111111", "implementer", "core", AgentRegisterReason::Normal), now))
        .unwrap();
    store
        .with_transaction(|tx| apply(tx, &register("agent:implementer:core:222222222222", "implementer", "core", AgentRegisterReason::Force), now))
        .unwrap();

    assert!(store.get_agent(&AgentId::from_string("agent:implementer:core:111111111111")).unwrap().is_none());
    let survivor = store.get_agent_by_role_module("implementer", "core").unwrap().unwrap();
    assert_eq!(survivor.agent_id, AgentId::from_string("agent:implementer:core:222222222222"));
}

#[test]
fn agent_register_idempotent_for_same_agent_id() {
    let mut store = Store::open_in_memory().unwrap();
    let now = Utc::now();
    let event = register("agent:implementer:core:111111111111", "implementer", "core", AgentRegisterReason::Normal);

    store.with_transaction(|tx| apply(tx, &event, now)).unwrap();
    store.with_transaction(|tx| apply(tx, &event, now)).unwrap();

    assert_eq!(store.list_agents().unwrap().len(), 1);
}

#[test]
fn session_start_crash_recovers_any_still_open_session_for_the_same_agent() {
    let mut store = Store::open_in_memory().unwrap();
    let now = Utc::now();
    let agent_id = AgentId::from_string("agent:implementer:core:111111111111");
    store.with_transaction(|tx| apply(tx, &register("agent:implementer:core:111111111111", "implementer", "core", AgentRegisterReason::Normal), now)).unwrap();

    let first = SessionId::new();
    store
        .with_transaction(|tx| apply(tx, &Event::SessionStart(SessionStartPayload { session_id: first.clone(), agent_id: agent_id.clone() }), now))
        .unwrap();

    let second = SessionId::new();
    store
        .with_transaction(|tx| apply(tx, &Event::SessionStart(SessionStartPayload { session_id: second.clone(), agent_id: agent_id.clone() }), now))
        .unwrap();

    let stale = store.get_session(&first).unwrap().unwrap();
    assert_eq!(stale.end_reason, Some(thrum_core::EndReason::CrashRecovered));
    let live = store.get_session(&second).unwrap().unwrap();
    assert!(live.is_active());
}

#[test]
fn message_create_persists_scopes_and_refs() {
    let mut store = Store::open_in_memory().unwrap();
    let now = Utc::now();
    let agent_id = AgentId::from_string("agent:implementer:core:111111111111");
    let session_id = SessionId::new();
    store.with_transaction(|tx| apply(tx, &register("agent:implementer:core:111111111111", "implementer", "core", AgentRegisterReason::Normal), now)).unwrap();
    store
        .with_transaction(|tx| apply(tx, &Event::SessionStart(SessionStartPayload { session_id: session_id.clone(), agent_id: agent_id.clone() }), now))
        .unwrap();

    let message_id = MessageId::new();
    let create = Event::MessageCreate(MessageCreatePayload {
        message_id: message_id.clone(),
        thread_id: Some(ThreadId::new()),
        agent_id: agent_id.clone(),
        session_id: session_id.clone(),
        body_format: BodyFormat::Plain,
        body_content: "hello".into(),
        body_structured: None,
        authored_by: None,
        disclosed: false,
        scopes: vec![Scope::Group("reviewers".into())],
        refs: vec![Ref::Mention("reviewer".into())],
    });

    // The EventLog's own sequence/high-water-mark bookkeeping is what
    // actually prevents double-application in the daemon; this asserts that
    // a single apply produces the one row we expect (the replay guard is
    // exercised end-to-end in the workspace-root scenario tests).
    store.with_transaction(|tx| apply(tx, &create, now)).unwrap();
    let stored = store.get_message(&message_id).unwrap().unwrap();
    assert_eq!(stored.body_content, "hello");
    assert_eq!(stored.scopes, vec![Scope::Group("reviewers".into())]);
}
