// SPDX-License-Identifier: MIT

//! Test-only builders for other crates' test suites (feature `test-support`).

use chrono::Utc;

use crate::agent::Agent;
use crate::id::{derive_agent_id, AgentId, AgentKind, SessionId};
use crate::message::{BodyFormat, Message};
use crate::session::Session;

/// Build an `Agent` with sensible defaults, for tests that don't care about
/// every field.
pub struct AgentBuilder {
    agent_id: AgentId,
    role: String,
    module: String,
}

impl AgentBuilder {
    pub fn new(role: &str, module: &str) -> Self {
        Self { agent_id: derive_agent_id("test-repo", role, module, None), role: role.into(), module: module.into() }
    }

    pub fn with_id(mut self, id: impl Into<AgentId>) -> Self {
        self.agent_id = id.into();
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            agent_id: self.agent_id,
            kind: AgentKind::Agent,
            role: self.role,
            module: self.module,
            display: None,
            hostname: None,
            registered_at: Utc::now(),
            last_seen_at: None,
        }
    }
}

pub struct MessageBuilder {
    agent_id: AgentId,
    session_id: SessionId,
    content: String,
}

impl MessageBuilder {
    pub fn new(agent_id: AgentId, session_id: SessionId) -> Self {
        Self { agent_id, session_id, content: "test message".into() }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn build(self) -> Message {
        Message {
            message_id: crate::id::MessageId::new(),
            thread_id: None,
            agent_id: self.agent_id,
            session_id: self.session_id,
            created_at: Utc::now(),
            updated_at: None,
            deleted: false,
            deleted_at: None,
            delete_reason: None,
            body_format: BodyFormat::Markdown,
            body_content: self.content,
            body_structured: None,
            authored_by: None,
            disclosed: false,
            scopes: Vec::new(),
            refs: Vec::new(),
        }
    }
}

pub fn active_session(agent_id: AgentId) -> Session {
    Session {
        session_id: SessionId::new(),
        agent_id,
        started_at: Utc::now(),
        ended_at: None,
        end_reason: None,
        last_seen_at: Utc::now(),
    }
}
