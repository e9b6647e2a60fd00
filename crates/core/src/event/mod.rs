// SPDX-License-Identifier: MIT

//! Event types for the thrum coordination daemon (spec.md §3 "Event").
//!
//! Serializes with `{"type": "agent.register", ...fields}` — one line per
//! event in the append-only log (`thrum-storage::EventLog`).

mod agent;
mod group;
mod message;
mod session;
mod subscription;

pub use agent::{AgentRegisterPayload, AgentRegisterReason};
pub use group::{GroupMemberPayload, GroupPayload};
pub use message::{MessageCreatePayload, MessageEditPayload, SendScope};
pub use session::{SessionHeartbeatPayload, SessionStartPayload};
pub use subscription::SubscriptionPayload;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{AgentId, EventId, GroupId, MessageId, SessionId, ThreadId};

/// One record in the append-only event log. `sequence` is assigned by the
/// `EventLog` at append time, never by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: EventId,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub origin_daemon: String,
    #[serde(flatten)]
    pub event: Event,
}

/// The type-specific payload of an event, tagged by `type` with the exact
/// method-group.verb spelling from spec.md §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "agent.register")]
    AgentRegister(AgentRegisterPayload),

    #[serde(rename = "agent.cleanup")]
    AgentCleanup { agent_id: AgentId },

    #[serde(rename = "session.start")]
    SessionStart(SessionStartPayload),

    #[serde(rename = "session.end")]
    SessionEnd { session_id: SessionId, reason: crate::session::EndReason },

    #[serde(rename = "session.heartbeat")]
    SessionHeartbeat(SessionHeartbeatPayload),

    #[serde(rename = "session.set_intent")]
    SessionSetIntent { session_id: SessionId, agent_id: AgentId, intent: String },

    #[serde(rename = "session.set_task")]
    SessionSetTask { session_id: SessionId, agent_id: AgentId, task: String },

    #[serde(rename = "message.create")]
    MessageCreate(MessageCreatePayload),

    #[serde(rename = "message.edit")]
    MessageEdit(MessageEditPayload),

    #[serde(rename = "message.delete")]
    MessageDelete { message_id: MessageId, reason: Option<String> },

    #[serde(rename = "message.read")]
    MessageRead { message_id: MessageId, session_id: SessionId, agent_id: AgentId },

    #[serde(rename = "group.create")]
    GroupCreate(GroupPayload),

    #[serde(rename = "group.delete")]
    GroupDelete { group_id: GroupId },

    #[serde(rename = "group.member.add")]
    GroupMemberAdd(GroupMemberPayload),

    #[serde(rename = "group.member.remove")]
    GroupMemberRemove(GroupMemberPayload),

    #[serde(rename = "thread.create")]
    ThreadCreate { thread_id: ThreadId, created_by: AgentId, title: Option<String> },

    #[serde(rename = "subscription.add")]
    SubscriptionAdd(SubscriptionPayload),

    #[serde(rename = "subscription.remove")]
    SubscriptionRemove { session_id: SessionId, subscription_id: crate::id::SubscriptionId },
}

impl Event {
    /// The `type` tag this event serializes as, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::AgentRegister(_) => "agent.register",
            Event::AgentCleanup { .. } => "agent.cleanup",
            Event::SessionStart(_) => "session.start",
            Event::SessionEnd { .. } => "session.end",
            Event::SessionHeartbeat(_) => "session.heartbeat",
            Event::SessionSetIntent { .. } => "session.set_intent",
            Event::SessionSetTask { .. } => "session.set_task",
            Event::MessageCreate(_) => "message.create",
            Event::MessageEdit(_) => "message.edit",
            Event::MessageDelete { .. } => "message.delete",
            Event::MessageRead { .. } => "message.read",
            Event::GroupCreate(_) => "group.create",
            Event::GroupDelete { .. } => "group.delete",
            Event::GroupMemberAdd(_) => "group.member.add",
            Event::GroupMemberRemove(_) => "group.member.remove",
            Event::ThreadCreate { .. } => "thread.create",
            Event::SubscriptionAdd(_) => "subscription.add",
            Event::SubscriptionRemove { .. } => "subscription.remove",
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
