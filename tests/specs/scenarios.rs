//! The six concrete end-to-end scenarios from spec.md §8 (S1-S6).

use serde_json::json;
use thrum_core::EndReason;
use thrum_daemon::config::Config;
use thrum_daemon::handlers::dispatch;
use thrum_daemon::lifecycle;

use super::harness::Harness;

fn ctx_for(handle: &lifecycle::DaemonHandle) -> thrum_daemon::handlers::HandlerContext {
    thrum_daemon::handlers::HandlerContext {
        state: handle.state.clone(),
        registry: handle.registry.clone(),
        config: std::sync::Arc::new(handle.config.clone()),
        start_time: handle.start_time,
        transport: thrum_daemon::handlers::TransportKind::Unix,
    }
}

/// S1: sending to an unknown recipient fails and leaves no message row.
#[test]
fn s1_unknown_recipient_fails_atomically() {
    let h = Harness::fresh();
    let (agent_id, session_id) = h.register_and_start("tester", "test-module");

    let err = h.send(&agent_id, &session_id, "hi", &["@ghost"]).unwrap_err();
    assert!(err.message.contains("unknown recipients"));
    assert!(err.message.contains("@ghost"));

    let inbox = h.call_ok("message.list", json!({ "page": 1, "page_size": 50 }));
    assert_eq!(inbox["total"], 0);
}

/// S2: a group mention fans a message out to exactly its members, tagged
/// with a group scope/ref and no mention ref.
#[test]
fn s2_group_mention_fans_out_to_members_only() {
    let h = Harness::fresh();
    let (alice_id, _alice_session) = h.register_and_start("reviewer", "alice-module");
    let (bob_id, _bob_session) = h.register_and_start("reviewer", "bob-module");
    let (sender_id, sender_session) = h.register_and_start("implementer", "core");

    let group = h.call_ok("group.create", json!({ "name": "reviewers", "created_by": sender_id }));
    let group_id = group["group_id"].as_str().unwrap();
    h.call_ok(
        "group.member.add",
        json!({ "group_id": group_id, "member_type": "agent", "member_value": alice_id }),
    );

    let sent = h.send(&sender_id, &sender_session, "please review", &["@reviewers"]).unwrap();
    let message = &sent["message"];
    assert!(message["scopes"].as_array().unwrap().iter().any(|s| s["kind"] == "group" && s["value"] == "reviewers"));
    assert!(message["refs"].as_array().unwrap().iter().any(|r| r["kind"] == "group" && r["value"] == "reviewers"));
    assert!(!message["refs"].as_array().unwrap().iter().any(|r| r["kind"] == "mention" && r["value"] == "reviewers"));

    let alice_inbox = h.inbox(&alice_id);
    assert_eq!(alice_inbox["total"], 1);
    let bob_inbox = h.inbox(&bob_id);
    assert_eq!(bob_inbox["total"], 0);
}

/// S3: `@everyone` reaches every registered agent's inbox.
#[test]
fn s3_everyone_reaches_every_registered_agent() {
    let h = Harness::fresh();
    let (alice_id, _) = h.register_and_start("implementer", "a");
    let (bob_id, _) = h.register_and_start("reviewer", "b");
    let (sender_id, sender_session) = h.register_and_start("orchestrator", "core");

    h.send(&sender_id, &sender_session, "kickoff", &["@everyone"]).unwrap();

    for agent in [&alice_id, &bob_id, &sender_id] {
        let inbox = h.inbox(agent);
        assert_eq!(inbox["total"], 1, "agent {agent} should see the @everyone message");
    }
}

/// S4: registering an agent produces exactly one group named after its
/// role, and re-registering the same role creates no duplicates.
#[test]
fn s4_role_auto_group_has_no_duplicates_on_re_register() {
    let h = Harness::fresh();
    h.call_ok("agent.register", json!({ "role": "implementer", "module": "core" }));
    // Same (role, module) re-registered: same derived agent_id, normal path.
    h.call_ok("agent.register", json!({ "role": "implementer", "module": "core" }));
    // A second, distinct agent with the same role via a different module.
    h.call_ok("agent.register", json!({ "role": "implementer", "module": "other" }));

    let groups = h.call_ok("group.list", json!({}));
    let implementer_groups: Vec<_> = groups.as_array().unwrap().iter().filter(|g| g["name"] == "implementer").collect();
    assert_eq!(implementer_groups.len(), 1, "expected exactly one auto-created role group");

    let group_id = implementer_groups[0]["group_id"].as_str().unwrap();
    let members = h.call_ok("group.members", json!({ "group_id": group_id }));
    let members = members["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["member_type"], "role");
    assert_eq!(members[0]["member_value"], "implementer");
}

/// S5: a reply clusters beneath its parent by default; an explicit
/// `sort_order` restores strict reverse-chronological order.
#[test]
fn s5_inbox_clustering_and_explicit_sort_order() {
    let h = Harness::fresh();
    let (alice_id, alice_session) = h.register_and_start("implementer", "core");

    let parent = h.send(&alice_id, &alice_session, "parent", &[]).unwrap();
    let parent_id = parent["message"]["message_id"].as_str().unwrap().to_string();

    let reply = h
        .call_ok(
            "message.send",
            json!({
                "agent_id": alice_id,
                "session_id": alice_session,
                "body_content": "reply",
                "reply_to": parent_id,
            }),
        )
        .clone();
    let reply_id = reply["message"]["message_id"].as_str().unwrap().to_string();

    let clustered = h.call_ok("message.list", json!({ "for_agent": alice_id, "page": 1, "page_size": 50 }));
    let ids: Vec<&str> = clustered["messages"].as_array().unwrap().iter().map(|m| m["message"]["message_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![parent_id.as_str(), reply_id.as_str()], "default order clusters the reply beneath its parent");

    let desc = h.call_ok("message.list", json!({ "for_agent": alice_id, "sort_order": "desc", "page": 1, "page_size": 50 }));
    let ids: Vec<&str> = desc["messages"].as_array().unwrap().iter().map(|m| m["message"]["message_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![reply_id.as_str(), parent_id.as_str()], "explicit sort_order restores reverse-chronological order");
}

/// S6: sessions left open by a crashed process are closed with
/// `crash_recovered` on the next startup; a freshly started one is active.
#[test]
fn s6_crash_recovery_closes_stale_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(Some(dir.path().to_path_buf())).unwrap();

    let handle = lifecycle::startup(config.clone()).unwrap();
    let ctx = ctx_for(&handle);
    let agent = dispatch(&ctx, "agent.register", Some(json!({ "role": "implementer", "module": "core" }))).unwrap();
    let agent_id = agent["agent_id"].as_str().unwrap().to_string();

    let stale_one = dispatch(&ctx, "session.start", Some(json!({ "agent_id": agent_id }))).unwrap();
    let stale_two = dispatch(&ctx, "session.start", Some(json!({ "agent_id": agent_id }))).unwrap();
    let stale_ids = vec![
        stale_one["session_id"].as_str().unwrap().to_string(),
        stale_two["session_id"].as_str().unwrap().to_string(),
    ];

    // Simulate a crash: drop the handle without calling `shutdown`, which
    // would otherwise flush and clear the lock in an orderly way. Dropping
    // `lock_file` still releases the exclusive lock, so the next `startup`
    // can proceed and run its crash-recovery sweep.
    drop(handle);

    let recovered = lifecycle::startup(config).unwrap();
    for session_id in &stale_ids {
        let session = recovered.state.read(|s| s.get_session(&thrum_core::SessionId::from_string(session_id))).unwrap().unwrap();
        assert!(!session.is_active());
        assert_eq!(session.end_reason, Some(EndReason::CrashRecovered));
    }

    let new_ctx = ctx_for(&recovered);
    let fresh = dispatch(&new_ctx, "session.start", Some(json!({ "agent_id": agent_id }))).unwrap();
    let fresh_session = recovered.state.read(|s| s.get_session(&thrum_core::SessionId::from_string(fresh["session_id"].as_str().unwrap()))).unwrap().unwrap();
    assert!(fresh_session.is_active());

    lifecycle::shutdown(recovered).unwrap();
}
