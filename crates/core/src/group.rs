// SPDX-License-Identifier: MIT

//! Groups: flat named sets of agent/role members (spec.md §3 "Group").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{AgentId, GroupId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: AgentId,
}

/// A member of a group: either a specific agent, or every agent with a role
/// (`role = "*"` matches everyone, used by the reserved `everyone` group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "member_type", rename_all = "snake_case")]
pub enum GroupMember {
    Agent { member_value: AgentId },
    Role { member_value: String },
}

impl GroupMember {
    pub fn matches(&self, agent_id: &AgentId, agent_role: &str) -> bool {
        match self {
            GroupMember::Agent { member_value } => member_value == agent_id,
            GroupMember::Role { member_value } => member_value == "*" || member_value == agent_role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wildcard_matches_any_role() {
        let member = GroupMember::Role { member_value: "*".into() };
        assert!(member.matches(&AgentId::from_string("agent:a:b:c"), "implementer"));
    }

    #[test]
    fn role_member_matches_only_same_role() {
        let member = GroupMember::Role { member_value: "implementer".into() };
        assert!(member.matches(&AgentId::from_string("agent:a:b:c"), "implementer"));
        assert!(!member.matches(&AgentId::from_string("agent:a:b:c"), "reviewer"));
    }

    #[test]
    fn agent_member_matches_only_that_agent() {
        let id = AgentId::from_string("agent:a:b:c");
        let member = GroupMember::Agent { member_value: id.clone() };
        assert!(member.matches(&id, "implementer"));
        assert!(!member.matches(&AgentId::from_string("agent:x:y:z"), "implementer"));
    }
}
