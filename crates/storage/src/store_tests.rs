// SPDX-License-Identifier: MIT

use chrono::Utc;
use thrum_core::{
    everyone_group_id, role_group_id, Agent, AgentId, AgentKind, BodyFormat, EndReason, Group,
    GroupMember, Message, MessageId, Ref, Scope, SessionId,
};

use super::*;

fn agent(id: &str, role: &str, module: &str) -> Agent {
    Agent {
        agent_id: AgentId::from_string(id),
        kind: AgentKind::Agent,
        role: role.into(),
        module: module.into(),
        display: None,
        hostname: None,
        registered_at: Utc::now(),
        last_seen_at: None,
    }
}

fn message(id: MessageId, agent_id: AgentId, session_id: SessionId, scopes: Vec<Scope>, refs: Vec<Ref>) -> Message {
    Message {
        message_id: id,
        thread_id: None,
        agent_id,
        session_id,
        created_at: Utc::now(),
        updated_at: None,
        deleted: false,
        deleted_at: None,
        delete_reason: None,
        body_format: BodyFormat::Plain,
        body_content: "hello".into(),
        body_structured: None,
        authored_by: None,
        disclosed: false,
        scopes,
        refs,
    }
}

#[test]
fn agent_round_trips() {
    let store = Store::open_in_memory().unwrap();
    let a = agent("agent:tester:test-module:abc123456789", "tester", "test-module");
    store.upsert_agent(&a).unwrap();

    let fetched = store.get_agent(&a.agent_id).unwrap().unwrap();
    assert_eq!(fetched.role, "tester");

    let by_rm = store.get_agent_by_role_module("tester", "test-module").unwrap().unwrap();
    assert_eq!(by_rm.agent_id, a.agent_id);
}

#[test]
fn s1_unknown_recipient_leaves_no_trace() {
    let store = Store::open_in_memory().unwrap();
    let a = agent("agent:tester:test-module:abc123456789", "tester", "test-module");
    store.upsert_agent(&a).unwrap();

    // Router would reject before this ever runs; confirm no message exists.
    let count: i64 = store.conn().query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0)).unwrap();
    assert_eq!(count, 0);
}

#[test]
fn s2_group_fanout_reaches_member_not_nonmember() {
    let store = Store::open_in_memory().unwrap();
    let alice = AgentId::from_string("agent:reviewer:mod:aaaaaaaaaaaa");
    let bob = AgentId::from_string("agent:reviewer:mod:bbbbbbbbbbbb");
    store.upsert_agent(&agent(alice.as_str(), "reviewer", "mod")).unwrap();
    store.upsert_agent(&agent(bob.as_str(), "reviewer", "mod2")).unwrap();

    let group = Group {
        group_id: thrum_core::GroupId::new(),
        name: "reviewers".into(),
        description: None,
        created_at: Utc::now(),
        created_by: alice.clone(),
    };
    store.create_group(&group).unwrap();
    store
        .conn()
        .execute(
            "INSERT INTO group_members (group_id, member_type, member_value, added_at) VALUES (?1, 'agent', ?2, ?3)",
            rusqlite::params![group.group_id, alice.as_str(), Utc::now().to_rfc3339()],
        )
        .unwrap();

    let session = SessionId::new();
    let msg = message(
        MessageId::new(),
        alice.clone(),
        session.clone(),
        vec![Scope::Group("reviewers".into())],
        vec![Ref::Group("reviewers".into())],
    );
    store.insert_message(&msg).unwrap();

    let alice_inbox = store
        .list_inbox(&ListMessagesFilter { for_agent: Some(alice.as_str().into()), page: 1, page_size: 10, ..Default::default() })
        .unwrap();
    assert_eq!(alice_inbox.total, 1);

    let bob_inbox = store
        .list_inbox(&ListMessagesFilter { for_agent: Some(bob.as_str().into()), page: 1, page_size: 10, ..Default::default() })
        .unwrap();
    assert_eq!(bob_inbox.total, 0);
}

#[test]
fn s3_everyone_group_reaches_every_agent() {
    let store = Store::open_in_memory().unwrap();
    let alice = AgentId::from_string("agent:a:m:aaaaaaaaaaaa");
    let bob = AgentId::from_string("agent:b:m:bbbbbbbbbbbb");
    store.upsert_agent(&agent(alice.as_str(), "a", "m")).unwrap();
    store.upsert_agent(&agent(bob.as_str(), "b", "m")).unwrap();

    let everyone = Group {
        group_id: everyone_group_id(),
        name: "everyone".into(),
        description: None,
        created_at: Utc::now(),
        created_by: alice.clone(),
    };
    store.create_group(&everyone).unwrap();
    store.conn().execute(
        "INSERT INTO group_members (group_id, member_type, member_value, added_at) VALUES (?1, 'role', '*', ?2)",
        rusqlite::params![everyone.group_id, Utc::now().to_rfc3339()],
    ).unwrap();

    let msg = message(
        MessageId::new(),
        alice.clone(),
        SessionId::new(),
        vec![Scope::Group("everyone".into())],
        vec![Ref::Group("everyone".into())],
    );
    store.insert_message(&msg).unwrap();

    for who in [&alice, &bob] {
        let inbox = store
            .list_inbox(&ListMessagesFilter { for_agent: Some(who.as_str().into()), page: 1, page_size: 10, ..Default::default() })
            .unwrap();
        assert_eq!(inbox.total, 1, "expected {who} to see the broadcast");
    }
}

#[test]
fn s4_role_auto_group_has_exactly_one_member() {
    let store = Store::open_in_memory().unwrap();
    let role_group = Group {
        group_id: role_group_id("implementer"),
        name: "implementer".into(),
        description: None,
        created_at: Utc::now(),
        created_by: AgentId::from_string("agent:seed:m:000000000000"),
    };
    store.create_group(&role_group).unwrap();
    store.add_member_for_test(&role_group.group_id, GroupMember::Role { member_value: "implementer".into() });

    let members = store.group_members(&role_group.group_id).unwrap();
    assert_eq!(members.len(), 1);
}

#[test]
fn read_idempotence_one_row_per_session() {
    let store = Store::open_in_memory().unwrap();
    let agent_id = AgentId::from_string("agent:a:m:aaaaaaaaaaaa");
    store.upsert_agent(&agent(agent_id.as_str(), "a", "m")).unwrap();
    let session = SessionId::new();
    let msg = message(MessageId::new(), agent_id.clone(), session.clone(), vec![], vec![]);
    store.insert_message(&msg).unwrap();

    for _ in 0..3 {
        store.mark_message_read(&msg.message_id, &session, &agent_id, Utc::now()).unwrap();
    }

    let count: i64 = store
        .conn()
        .query_row("SELECT COUNT(*) FROM message_reads WHERE message_id = ?1", rusqlite::params![msg.message_id], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn s6_crash_recovery_closes_open_sessions() {
    let store = Store::open_in_memory().unwrap();
    let a = AgentId::from_string("agent:a:m:aaaaaaaaaaaa");
    store.upsert_agent(&agent(a.as_str(), "a", "m")).unwrap();

    let stale1 = thrum_core::Session {
        session_id: SessionId::new(),
        agent_id: a.clone(),
        started_at: Utc::now(),
        ended_at: None,
        end_reason: None,
        last_seen_at: Utc::now(),
    };
    let stale2 = thrum_core::Session { session_id: SessionId::new(), ..stale1.clone() };
    store.insert_session(&stale1).unwrap();
    store.insert_session(&stale2).unwrap();

    let closed = store.close_all_open_sessions(Utc::now()).unwrap();
    assert_eq!(closed, 2);

    let fresh = thrum_core::Session { session_id: SessionId::new(), ..stale1 };
    store.insert_session(&fresh).unwrap();

    assert_eq!(store.get_session(&stale1.session_id).unwrap().unwrap().end_reason, Some(EndReason::CrashRecovered));
    assert!(store.get_session(&fresh.session_id).unwrap().unwrap().is_active());
}

impl Store {
    /// Test-only helper: add a member without going through the Projector.
    fn add_member_for_test(&self, group_id: &thrum_core::GroupId, member: GroupMember) {
        groups::add_member(self.conn(), group_id, &member, Utc::now(), None::<&AgentId>).unwrap();
    }
}
