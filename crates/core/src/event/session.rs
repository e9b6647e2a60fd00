// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::id::{AgentId, SessionId};
use crate::message::{Ref, Scope};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStartPayload {
    pub session_id: SessionId,
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHeartbeatPayload {
    pub session_id: SessionId,
    pub agent_id: AgentId,
    #[serde(default)]
    pub add_scopes: Vec<Scope>,
    #[serde(default)]
    pub remove_scopes: Vec<Scope>,
    #[serde(default)]
    pub add_refs: Vec<Ref>,
    #[serde(default)]
    pub remove_refs: Vec<Ref>,
    /// Present when this heartbeat should trigger an async work-context
    /// extraction (spec.md §4.7).
    #[serde(default)]
    pub worktree_path: Option<String>,
}
