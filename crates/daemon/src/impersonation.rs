// SPDX-License-Identifier: MIT

//! Impersonation validation (spec.md §4.4): lets a `user:*` identity send a
//! message that reads as authored by an `agent:*` identity, with the real
//! caller recorded in `authored_by`.

use thrum_core::{AgentId, AgentKind, ThrumError};

use crate::state::StateLock;

/// The resolved identity a message should actually be authored under, after
/// impersonation rules are checked.
pub struct AuthoredAs {
    pub agent_id: AgentId,
    pub authored_by: Option<AgentId>,
    pub disclosed: bool,
}

/// Validates an `acting_as` request. Rules: only `user:*` callers may
/// impersonate; the target must be `agent:*`; the target must already be
/// registered. Returns the resolved author identity on success.
pub fn resolve_author(
    state: &StateLock,
    caller: &AgentId,
    acting_as: Option<&AgentId>,
    disclose: bool,
) -> Result<AuthoredAs, ThrumError> {
    let Some(target) = acting_as else {
        return Ok(AuthoredAs { agent_id: caller.clone(), authored_by: None, disclosed: false });
    };

    if caller.kind() != AgentKind::User {
        return Err(ThrumError::Authorization(format!("{} is not a user identity and cannot impersonate", caller.as_str())));
    }
    if target.kind() != AgentKind::Agent {
        return Err(ThrumError::Authorization(format!("impersonation target {} is not an agent identity", target.as_str())));
    }

    let exists = state.read(|store| store.get_agent(target).map(|a| a.is_some())).map_err(|e| ThrumError::Internal(e.to_string()))?;
    if !exists {
        return Err(ThrumError::NotFound(format!("impersonation target {} is not registered", target.as_str())));
    }

    Ok(AuthoredAs { agent_id: target.clone(), authored_by: Some(caller.clone()), disclosed: disclose })
}
