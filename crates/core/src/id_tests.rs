// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn derive_agent_id_is_deterministic() {
    let a = derive_agent_id("repo-1", "implementer", "auth", None);
    let b = derive_agent_id("repo-1", "implementer", "auth", None);
    assert_eq!(a, b);
    assert!(a.as_str().starts_with("agent:implementer:auth:"));
}

#[test]
fn derive_agent_id_varies_by_input() {
    let a = derive_agent_id("repo-1", "implementer", "auth", None);
    let b = derive_agent_id("repo-1", "implementer", "billing", None);
    let c = derive_agent_id("repo-2", "implementer", "auth", None);
    assert_ne!(a, b);
    assert_ne!(a, c);
}

#[test]
fn explicit_name_bypasses_derivation() {
    let a = derive_agent_id("repo-1", "implementer", "auth", Some("alice"));
    assert_eq!(a.as_str(), "alice");
}

#[test]
fn name_validation() {
    assert!(is_valid_name("alice"));
    assert!(is_valid_name("alice_2"));
    assert!(is_valid_name("a"));
    assert!(!is_valid_name(""));
    assert!(!is_valid_name(&"a".repeat(33)));
    assert!(!is_valid_name("alice bob"));
    assert!(!is_valid_name("alice@bob"));
}

#[test]
fn message_id_round_trips() {
    let id = MessageId::new();
    assert!(id.as_str().starts_with(MessageId::PREFIX));
    let back = MessageId::from_string(id.as_str());
    assert_eq!(id, back);
}

#[test]
fn everyone_group_is_stable() {
    assert_eq!(everyone_group_id(), everyone_group_id());
    assert_eq!(everyone_group_id().as_str(), "grp_everyone");
}
