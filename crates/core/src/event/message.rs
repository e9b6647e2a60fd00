// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::id::{AgentId, MessageId, SessionId, ThreadId};
use crate::message::{BodyFormat, Ref, Scope};

/// The send-time shape of a scope, before it is attached to a committed
/// message. Identical to [`Scope`] but kept distinct so the `Router`'s output
/// type doesn't implicitly depend on storage-layer framing.
pub type SendScope = Scope;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCreatePayload {
    pub message_id: MessageId,
    pub thread_id: Option<ThreadId>,
    pub agent_id: AgentId,
    pub session_id: SessionId,
    pub body_format: BodyFormat,
    pub body_content: String,
    pub body_structured: Option<serde_json::Value>,
    pub authored_by: Option<AgentId>,
    pub disclosed: bool,
    pub scopes: Vec<Scope>,
    pub refs: Vec<Ref>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEditPayload {
    pub message_id: MessageId,
    pub editor_agent_id: AgentId,
    pub body_format: BodyFormat,
    pub body_content: String,
    pub body_structured: Option<serde_json::Value>,
}
