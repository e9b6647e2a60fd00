// SPDX-License-Identifier: MIT

//! Message records, scopes, and refs (spec.md §3 "Message", "Message scopes / refs").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{AgentId, MessageId, SessionId, ThreadId};

/// Wire/storage encoding of a message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyFormat {
    Markdown,
    Plain,
    Json,
}

impl BodyFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyFormat::Markdown => "markdown",
            BodyFormat::Plain => "plain",
            BodyFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for BodyFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markdown" => Ok(BodyFormat::Markdown),
            "plain" => Ok(BodyFormat::Plain),
            "json" => Ok(BodyFormat::Json),
            other => Err(format!("unknown body_format: {other}")),
        }
    }
}

/// A single message, possibly impersonated, possibly edited, possibly
/// soft-deleted. Current body lives on the row; edit history is append-only
/// in a separate `message_edits` table (see `thrum-storage`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    pub thread_id: Option<ThreadId>,
    /// Author, or the impersonated subject when `authored_by` is set.
    pub agent_id: AgentId,
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub delete_reason: Option<String>,
    pub body_format: BodyFormat,
    pub body_content: String,
    pub body_structured: Option<serde_json::Value>,
    /// Impersonator's user id, when this message was sent via `acting_as`.
    pub authored_by: Option<AgentId>,
    pub disclosed: bool,
    pub scopes: Vec<Scope>,
    pub refs: Vec<Ref>,
}

impl Message {
    /// The "legacy broadcast" condition in spec.md §4.5 arm 3: no mention refs
    /// and no group scopes at all.
    pub fn is_legacy_broadcast(&self) -> bool {
        !self.refs.iter().any(|r| matches!(r, Ref::Mention(_)))
            && !self.scopes.iter().any(|s| matches!(s, Scope::Group(_)))
    }

    pub fn reply_to(&self) -> Option<&MessageId> {
        self.refs.iter().find_map(|r| match r {
            Ref::ReplyTo(id) => Some(id),
            _ => None,
        })
    }
}

/// A semantic routing dimension attached to a message. Scopes are used for
/// pull-based delivery (group membership), not push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scope {
    Group(String),
    Module(String),
    File(String),
    Repo(String),
}

impl Scope {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Scope::Group(_) => "group",
            Scope::Module(_) => "module",
            Scope::File(_) => "file",
            Scope::Repo(_) => "repo",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Scope::Group(v) | Scope::Module(v) | Scope::File(v) | Scope::Repo(v) => v,
        }
    }
}

/// An audit/relational annotation attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Ref {
    /// Push-to-individual: resolves to an agent or role name.
    Mention(String),
    /// Audit trail for a group mention (the actual routing is the `Scope::Group`).
    Group(String),
    ReplyTo(MessageId),
    Issue(String),
    Commit(String),
}

impl Ref {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Ref::Mention(_) => "mention",
            Ref::Group(_) => "group",
            Ref::ReplyTo(_) => "reply_to",
            Ref::Issue(_) => "issue",
            Ref::Commit(_) => "commit",
        }
    }

    pub fn value(&self) -> String {
        match self {
            Ref::Mention(v) | Ref::Group(v) | Ref::Issue(v) | Ref::Commit(v) => v.clone(),
            Ref::ReplyTo(id) => id.as_str().to_string(),
        }
    }
}

/// One entry in the append-only `message_edits` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEdit {
    pub message_id: MessageId,
    pub version: u32,
    pub body_format: BodyFormat,
    pub body_content: String,
    pub body_structured: Option<serde_json::Value>,
    pub edited_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
