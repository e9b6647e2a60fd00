// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::group::GroupMember;
use crate::id::{AgentId, GroupId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPayload {
    pub group_id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub created_by: AgentId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMemberPayload {
    pub group_id: GroupId,
    pub member: GroupMember,
    pub added_by: Option<AgentId>,
}
