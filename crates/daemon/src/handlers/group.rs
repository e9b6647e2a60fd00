// SPDX-License-Identifier: MIT

//! `group.*` (spec.md §3 "Group", §4.2 "group.*": maintain groups/members,
//! reject any mutation targeting `everyone` beyond the initial seed).

use serde::{Deserialize, Serialize};
use thrum_core::event::{GroupMemberPayload, GroupPayload};
use thrum_core::{AgentId, Event, GroupId, GroupMember, ThrumError};

use super::{parse, to_json, HandlerContext, HandlerResult};

fn reject_everyone(group_id: &GroupId) -> Result<(), ThrumError> {
    if *group_id == thrum_core::everyone_group_id() {
        return Err(ThrumError::Validation("the everyone group cannot be modified".into()));
    }
    Ok(())
}

#[derive(Deserialize)]
struct CreateParams {
    name: String,
    created_by: String,
    #[serde(default)]
    description: Option<String>,
}

pub fn create(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: CreateParams = parse(params)?;

    if !thrum_core::is_valid_name(&p.name) {
        return Err(ThrumError::Validation(format!("invalid group name: {}", p.name)));
    }
    if p.name == thrum_core::EVERYONE_GROUP_NAME {
        return Err(ThrumError::Conflict("the everyone group already exists".into()));
    }
    let existing = ctx.state.read(|s| s.get_group_by_name(&p.name))?;
    if existing.is_some() {
        return Err(ThrumError::Conflict(format!("a group named {} already exists", p.name)));
    }

    let created_by = AgentId::from_string(&p.created_by);
    let exists = ctx.state.read(|s| s.get_agent(&created_by))?.is_some();
    if !exists {
        return Err(ThrumError::NotFound(format!("agent {} is not registered", p.created_by)));
    }

    let group_id = GroupId::new();
    ctx.state.write(|s| {
        s.commit(Event::GroupCreate(GroupPayload {
            group_id: group_id.clone(),
            name: p.name.clone(),
            description: p.description.clone(),
            created_by,
        }))
    })?;

    let group = ctx.state.read(|s| s.get_group(&group_id))?.ok_or_else(|| ThrumError::Internal("group vanished after create".into()))?;
    to_json(group)
}

#[derive(Deserialize)]
struct GroupIdParams {
    group_id: String,
}

pub fn delete(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: GroupIdParams = parse(params)?;
    let group_id = GroupId::from_string(&p.group_id);
    reject_everyone(&group_id)?;

    let exists = ctx.state.read(|s| s.get_group(&group_id))?.is_some();
    if !exists {
        return Err(ThrumError::NotFound(format!("group {} does not exist", p.group_id)));
    }

    ctx.state.write(|s| s.commit(Event::GroupDelete { group_id }))?;
    to_json(serde_json::json!({ "deleted": true }))
}

#[derive(Deserialize)]
struct MemberParams {
    group_id: String,
    #[serde(flatten)]
    member: MemberSpec,
    #[serde(default)]
    added_by: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "member_type", rename_all = "snake_case")]
enum MemberSpec {
    Agent { member_value: String },
    Role { member_value: String },
}

impl MemberSpec {
    fn into_member(self) -> Result<GroupMember, ThrumError> {
        Ok(match self {
            // Groups are flat: a group cannot itself be a member of another
            // group (spec.md §3, §8 invariant 8). Rejected by construction —
            // `MemberSpec` has no `Group` variant, so this can't be built
            // from wire input at all; nothing further to check here.
            MemberSpec::Agent { member_value } => GroupMember::Agent { member_value: AgentId::from_string(member_value) },
            MemberSpec::Role { member_value } => GroupMember::Role { member_value },
        })
    }
}

pub fn member_add(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: MemberParams = parse(params)?;
    let group_id = GroupId::from_string(&p.group_id);
    reject_everyone(&group_id)?;

    let group = ctx.state.read(|s| s.get_group(&group_id))?.ok_or_else(|| ThrumError::NotFound(format!("group {} does not exist", p.group_id)))?;
    let member = p.member.into_member()?;
    let added_by = p.added_by.as_deref().map(AgentId::from_string);

    ctx.state.write(|s| s.commit(Event::GroupMemberAdd(GroupMemberPayload { group_id: group.group_id.clone(), member, added_by })))?;

    let members = ctx.state.read(|s| s.group_members(&group.group_id))?;
    to_json(members)
}

pub fn member_remove(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: MemberParams = parse(params)?;
    let group_id = GroupId::from_string(&p.group_id);
    reject_everyone(&group_id)?;

    let group = ctx.state.read(|s| s.get_group(&group_id))?.ok_or_else(|| ThrumError::NotFound(format!("group {} does not exist", p.group_id)))?;
    let member = p.member.into_member()?;

    ctx.state.write(|s| s.commit(Event::GroupMemberRemove(GroupMemberPayload { group_id: group.group_id.clone(), member, added_by: None })))?;

    let members = ctx.state.read(|s| s.group_members(&group.group_id))?;
    to_json(members)
}

pub fn list(ctx: &HandlerContext, _params: Option<serde_json::Value>) -> HandlerResult {
    let groups = ctx.state.read(|s| s.list_groups())?;
    to_json(groups)
}

pub fn info(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: GroupIdParams = parse(params)?;
    let group_id = GroupId::from_string(&p.group_id);
    let group = ctx.state.read(|s| s.get_group(&group_id))?.ok_or_else(|| ThrumError::NotFound(format!("group {} does not exist", p.group_id)))?;
    to_json(group)
}

#[derive(Serialize)]
struct MembersResult {
    members: Vec<GroupMember>,
    expanded: Vec<AgentId>,
}

pub fn members(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: GroupIdParams = parse(params)?;
    let group_id = GroupId::from_string(&p.group_id);
    let group = ctx.state.read(|s| s.get_group(&group_id))?.ok_or_else(|| ThrumError::NotFound(format!("group {} does not exist", p.group_id)))?;

    let members = ctx.state.read(|s| s.group_members(&group.group_id))?;
    let expanded = ctx.state.read(|s| s.expand_group_members(&group.name))?;
    to_json(MembersResult { members, expanded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatcher::Registry;
    use crate::state::StateLock;
    use std::sync::Arc;
    use std::time::Instant;
    use thrum_core::event::AgentRegisterReason;

    fn fresh_ctx() -> HandlerContext {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().to_path_buf())).unwrap();
        std::mem::forget(dir);
        let state = StateLock::open(&config, "test-daemon").unwrap();
        HandlerContext { state, registry: Registry::new(), config: Arc::new(config), start_time: Instant::now(), transport: super::super::TransportKind::Unix }
    }

    fn register(ctx: &HandlerContext, agent_id: &str) {
        ctx.state
            .write(|s| {
                s.commit(Event::AgentRegister(thrum_core::event::AgentRegisterPayload {
                    agent_id: AgentId::from_string(agent_id),
                    role: "implementer".into(),
                    module: "core".into(),
                    display: None,
                    hostname: None,
                    reason: AgentRegisterReason::Normal,
                }))
            })
            .unwrap();
    }

    #[test]
    fn creating_a_duplicate_group_name_is_a_conflict() {
        let ctx = fresh_ctx();
        register(&ctx, "agent:implementer:core:111111111111");
        create(&ctx, Some(serde_json::json!({"name": "reviewers", "created_by": "agent:implementer:core:111111111111"}))).unwrap();
        let err = create(&ctx, Some(serde_json::json!({"name": "reviewers", "created_by": "agent:implementer:core:111111111111"}))).unwrap_err();
        assert!(matches!(err, ThrumError::Conflict(_)));
    }

    #[test]
    fn everyone_cannot_be_deleted() {
        let ctx = fresh_ctx();
        crate::group_resolver::seed_everyone_group(&ctx.state, &AgentId::from_string("agent:system:daemon:000000000000")).unwrap();
        let err = delete(&ctx, Some(serde_json::json!({"group_id": thrum_core::everyone_group_id().as_str()}))).unwrap_err();
        assert!(matches!(err, ThrumError::Validation(_)));
    }

    #[test]
    fn everyone_cannot_gain_a_member() {
        let ctx = fresh_ctx();
        crate::group_resolver::seed_everyone_group(&ctx.state, &AgentId::from_string("agent:system:daemon:000000000000")).unwrap();
        register(&ctx, "agent:implementer:core:111111111111");
        let err = member_add(
            &ctx,
            Some(serde_json::json!({
                "group_id": thrum_core::everyone_group_id().as_str(),
                "member_type": "agent",
                "member_value": "agent:implementer:core:111111111111",
            })),
        )
        .unwrap_err();
        assert!(matches!(err, ThrumError::Validation(_)));
    }

    /// spec.md §8 invariant 8 ("group flatness"): `MemberSpec` has no
    /// `Group` variant, so a group-typed member is rejected at the wire
    /// boundary before it ever reaches a handler.
    #[test]
    fn a_group_typed_member_is_rejected_at_deserialization() {
        let ctx = fresh_ctx();
        register(&ctx, "agent:implementer:core:111111111111");
        let created = create(&ctx, Some(serde_json::json!({"name": "reviewers", "created_by": "agent:implementer:core:111111111111"}))).unwrap();
        let group_id = created["group_id"].as_str().unwrap().to_string();

        let err = member_add(
            &ctx,
            Some(serde_json::json!({"group_id": group_id, "member_type": "group", "member_value": "reviewers"})),
        )
        .unwrap_err();
        assert!(matches!(err, ThrumError::Validation(_)));
    }

    #[test]
    fn adding_a_member_to_a_fresh_group_round_trips() {
        let ctx = fresh_ctx();
        register(&ctx, "agent:implementer:core:111111111111");
        register(&ctx, "agent:alice:core:222222222222");
        let created = create(&ctx, Some(serde_json::json!({"name": "reviewers", "created_by": "agent:implementer:core:111111111111"}))).unwrap();
        let group_id = created["group_id"].as_str().unwrap().to_string();

        let members = member_add(
            &ctx,
            Some(serde_json::json!({"group_id": group_id, "member_type": "agent", "member_value": "agent:alice:core:222222222222"})),
        )
        .unwrap();
        assert_eq!(members.as_array().unwrap().len(), 1);
    }
}
