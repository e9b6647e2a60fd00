// SPDX-License-Identifier: MIT

//! Agent and user identity records (spec.md §3 "Agent").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{AgentId, AgentKind};

/// A registered participant: an automated agent or a human user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: AgentId,
    pub kind: AgentKind,
    pub role: String,
    pub module: String,
    pub display: Option<String>,
    pub hostname: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Outcome of a registration attempt, distinguishing the idempotent path from
/// the conflict-resolution paths spec.md §3 describes (`force`, `re_register`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// A brand new agent row was created.
    Created,
    /// The same `agent_id` registered again — a no-op per spec.md §3.
    Idempotent,
    /// A different `agent_id` updated the existing `(role, module)` row in place (`re_register`).
    Reregistered,
    /// A different `agent_id` evicted the prior `(role, module)` row (`force`).
    Forced,
}
