// SPDX-License-Identifier: MIT

use super::*;
use chrono::Utc;

fn base_message() -> Message {
    Message {
        message_id: MessageId::new(),
        thread_id: None,
        agent_id: AgentId::from_string("agent:implementer:core:abc123abc123"),
        session_id: SessionId::new(),
        created_at: Utc::now(),
        updated_at: None,
        deleted: false,
        deleted_at: None,
        delete_reason: None,
        body_format: BodyFormat::Markdown,
        body_content: "hello".into(),
        body_structured: None,
        authored_by: None,
        disclosed: false,
        scopes: Vec::new(),
        refs: Vec::new(),
    }
}

#[test]
fn legacy_broadcast_with_no_mentions_or_group_scopes() {
    let msg = base_message();
    assert!(msg.is_legacy_broadcast());
}

#[test]
fn mention_ref_disqualifies_legacy_broadcast() {
    let mut msg = base_message();
    msg.refs.push(Ref::Mention("alice".into()));
    assert!(!msg.is_legacy_broadcast());
}

#[test]
fn group_scope_disqualifies_legacy_broadcast() {
    let mut msg = base_message();
    msg.scopes.push(Scope::Group("reviewers".into()));
    assert!(!msg.is_legacy_broadcast());
}

#[test]
fn reply_to_extracted_from_refs() {
    let mut msg = base_message();
    let parent = MessageId::new();
    msg.refs.push(Ref::ReplyTo(parent.clone()));
    assert_eq!(msg.reply_to(), Some(&parent));
}

#[test]
fn body_format_round_trips_through_str() {
    for fmt in [BodyFormat::Markdown, BodyFormat::Plain, BodyFormat::Json] {
        let parsed: BodyFormat = fmt.as_str().parse().unwrap();
        assert_eq!(parsed, fmt);
    }
}
