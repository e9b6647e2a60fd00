// SPDX-License-Identifier: MIT

//! Session lifecycle records (spec.md §3 "Session").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{AgentId, SessionId};

/// A client connection window. Messages are attributed to a session, and
/// reads are tracked per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub end_reason: Option<EndReason>,
    pub last_seen_at: DateTime<Utc>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Explicit `session.end`.
    Client,
    /// Closed by the daemon startup crash-recovery sweep (spec.md §4.7).
    CrashRecovered,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Client => "client",
            EndReason::CrashRecovered => "crash_recovered",
        }
    }
}

impl std::str::FromStr for EndReason {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(EndReason::Client),
            "crash_recovered" => Ok(EndReason::CrashRecovered),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
