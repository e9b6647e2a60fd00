// SPDX-License-Identifier: MIT

//! Group lookups and the `everyone` group's lifecycle (spec.md §3, §4.3).
//!
//! Thin on purpose: `thrum_storage::store::groups` already holds the SQL.
//! This module adds the pieces that need the daemon's own state — seeding
//! `everyone` at startup, and classifying a mention target the way the
//! router needs (group vs. role-or-agent vs. unknown).

use thrum_core::event::{GroupMemberPayload, GroupPayload};
use thrum_core::{AgentId, Event, GroupId, GroupMember};

use crate::state::StateLock;

/// What a bare name in a `to`/`scope`/mention resolves to (spec.md §4.3 step
/// 3): an existing group, a role/agent match, or nothing at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Group(GroupId),
    Agents(Vec<AgentId>),
    Unknown,
}

/// Classifies `name` for mention routing: group membership wins over a bare
/// role/agent id match, since a group named the same as a role would
/// otherwise be ambiguous (spec.md §4.3 disambiguation order).
pub fn resolve(state: &StateLock, name: &str) -> Result<Resolved, thrum_storage::StorageError> {
    state.read(|store| {
        if let Some(group) = store.get_group_by_name(name)? {
            return Ok(Resolved::Group(group.group_id));
        }
        let agents = store.find_agents_by_id_or_role(name)?;
        if agents.is_empty() {
            Ok(Resolved::Unknown)
        } else {
            Ok(Resolved::Agents(agents.into_iter().map(|a| a.agent_id).collect()))
        }
    })
}

/// Creates the reserved `everyone` group if it doesn't already exist. Called
/// once during startup, before the listener binds (spec.md §3: "every agent
/// is implicitly a member of `everyone`").
pub fn seed_everyone_group(state: &StateLock, system_agent: &AgentId) -> Result<(), thrum_storage::StorageError> {
    let already_exists = state.read(|store| store.get_group(&thrum_core::everyone_group_id()).map(|g| g.is_some()))?;
    if already_exists {
        return Ok(());
    }

    state.write(|s| {
        s.commit(Event::GroupCreate(GroupPayload {
            group_id: thrum_core::everyone_group_id(),
            name: thrum_core::EVERYONE_GROUP_NAME.to_string(),
            description: Some("every registered agent".to_string()),
            created_by: system_agent.clone(),
        }))?;
        s.commit(Event::GroupMemberAdd(GroupMemberPayload {
            group_id: thrum_core::everyone_group_id(),
            member: GroupMember::Role { member_value: "*".to_string() },
            added_by: None,
        }))?;
        Ok(())
    })
}
