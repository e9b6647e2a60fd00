// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::id::AgentId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegisterPayload {
    pub agent_id: AgentId,
    pub role: String,
    pub module: String,
    pub display: Option<String>,
    pub hostname: Option<String>,
    pub reason: AgentRegisterReason,
}

/// How a re-registration under the same `(role, module)` but a different
/// `agent_id` should be resolved (spec.md §3 "Agent").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRegisterReason {
    /// No conflicting `(role, module)` row, or the same `agent_id` re-registering.
    Normal,
    /// `force = true`: evict the prior row.
    Force,
    /// `re_register = true`: update the prior row in place.
    ReRegister,
}
