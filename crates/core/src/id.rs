// SPDX-License-Identifier: MIT

//! Identity derivation: stable IDs for agents/users/groups/messages/sessions/threads.

use sha2::{Digest, Sha256};

use crate::define_id;

define_id! {
    /// Opaque append-only log record id.
    pub struct EventId("evt_");
}

define_id! {
    /// `msg_<opaque>`.
    pub struct MessageId("msg_");
}

define_id! {
    /// `sess_<opaque>`.
    pub struct SessionId("sess_");
}

define_id! {
    /// `thr_<opaque>`.
    pub struct ThreadId("thr_");
}

define_id! {
    /// `grp_<opaque>`, or the reserved literal `grp_everyone`.
    pub struct GroupId("grp_");
}

define_id! {
    /// `sub_<opaque>`.
    pub struct SubscriptionId("sub_");
}

/// `agent:<role>:<module>:<12-hex>` (derived) or a caller-chosen literal name.
/// `user:<username>` for human participants.
///
/// Not generated via [`define_id!`]'s random constructor: agent/user ids are
/// always either derived deterministically ([`derive_agent_id`]) or supplied
/// verbatim by the caller, never randomly minted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub smol_str::SmolStr);

impl AgentId {
    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(smol_str::SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn kind(&self) -> AgentKind {
        if self.0.starts_with("user:") {
            AgentKind::User
        } else {
            AgentKind::Agent
        }
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq<str> for AgentId {
    fn eq(&self, other: &str) -> bool {
        self.0.as_str() == other
    }
}

impl std::borrow::Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl rusqlite::types::ToSql for AgentId {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::from(self.0.as_str()))
    }
}

impl rusqlite::types::FromSql for AgentId {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        value.as_str().map(Self::from_string)
    }
}

/// Whether an [`AgentId`] names an automated agent or a human user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Agent,
    User,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AgentKind::Agent => "agent",
            AgentKind::User => "user",
        })
    }
}

/// Derive a stable agent id from `(repo_id, role, module, name)` per spec.md §3:
/// `agent:<role>:<module>:<12-hex-of-sha256(repo_id||role||module||name)>`.
///
/// When `name` is `Some`, it is used verbatim as the id instead (the caller
/// picked an explicit identity and the derivation is skipped).
pub fn derive_agent_id(repo_id: &str, role: &str, module: &str, name: Option<&str>) -> AgentId {
    if let Some(name) = name {
        return AgentId::from_string(name);
    }
    let mut hasher = Sha256::new();
    hasher.update(repo_id.as_bytes());
    hasher.update(role.as_bytes());
    hasher.update(module.as_bytes());
    hasher.update(b""); // no explicit name was given
    let digest = hasher.finalize();
    let hex12 = hex::encode(&digest[..6]); // 6 bytes = 12 hex chars
    AgentId::from_string(format!("agent:{role}:{module}:{hex12}"))
}

/// Build a user id from a username: `user:<username>`.
pub fn user_id(username: &str) -> AgentId {
    AgentId::from_string(format!("user:{username}"))
}

/// The reserved group id/name that matches every agent via `(role, "*")`.
pub const EVERYONE_GROUP_NAME: &str = "everyone";

/// Group id for the reserved `everyone` group — stable, not randomly minted.
pub fn everyone_group_id() -> GroupId {
    GroupId::from_string("grp_everyone")
}

/// Group id for a role's auto-created group: `grp_role_<role>`.
pub fn role_group_id(role: &str) -> GroupId {
    GroupId::from_string(format!("grp_role_{role}"))
}

/// Validate a caller-chosen name per spec.md §3: alphanumeric/`_`/`-`, length 1-32.
pub fn is_valid_name(name: &str) -> bool {
    let len = name.chars().count();
    (1..=32).contains(&len)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
