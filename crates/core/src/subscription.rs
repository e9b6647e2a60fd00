// SPDX-License-Identifier: MIT

//! Real-time push subscriptions (spec.md §3 "Subscription").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::SessionId;
use crate::message::Scope;

/// A live session's interest in a stream of messages. `all = true` denotes
/// the firehose; otherwise exactly one of `scope`/`mention_role` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub session_id: SessionId,
    pub scope: Option<Scope>,
    pub mention_role: Option<String>,
    pub all: bool,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Subscription-match rule from spec.md §4.6.
    pub fn matches(&self, scopes: &[Scope], mentions: &[&str]) -> bool {
        if self.all {
            return true;
        }
        if let Some(scope) = &self.scope {
            if scopes.contains(scope) {
                return true;
            }
        }
        if let Some(role) = &self.mention_role {
            if mentions.contains(&role.as_str()) {
                return true;
            }
        }
        false
    }
}
