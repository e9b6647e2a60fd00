// SPDX-License-Identifier: MIT

//! Server-push notification payloads (spec.md §4.6, §4.8).
//!
//! These are JSON-RPC notifications (no `id`, no reply expected) sent over a
//! WebSocket connection once a subscription matches a newly committed event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thrum_core::{AgentId, MessageId, Ref, Scope, ThreadId};

/// `notify.message` push: a new or edited message matched one of the
/// connection's subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub message_id: MessageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    pub agent_id: AgentId,
    pub preview: String,
    pub scopes: Vec<Scope>,
    pub refs: Vec<Ref>,
    pub timestamp: DateTime<Utc>,
}

/// Preview strings are truncated to this many characters (spec.md §4.6).
pub const PREVIEW_MAX_CHARS: usize = 100;

impl Notification {
    /// Truncates `body` to `PREVIEW_MAX_CHARS` characters, respecting UTF-8
    /// boundaries, for use as the `preview` field.
    pub fn truncate_preview(body: &str) -> String {
        match body.char_indices().nth(PREVIEW_MAX_CHARS) {
            Some((byte_idx, _)) => body[..byte_idx].to_string(),
            None => body.to_string(),
        }
    }
}

/// `notify.thread` push: a thread's reply count or latest activity changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadNotification {
    pub thread_id: ThreadId,
    pub root_message_id: MessageId,
    pub reply_count: u64,
    pub last_reply_at: DateTime<Utc>,
    pub last_reply_agent_id: AgentId,
}

/// The method name a [`Notification`] is wrapped under when framed as a
/// JSON-RPC notification object (`{"jsonrpc":"2.0","method":"notify.message","params":...}`).
pub const NOTIFY_MESSAGE_METHOD: &str = "notify.message";
pub const NOTIFY_THREAD_METHOD: &str = "notify.thread";

/// Wrap a push payload as the bare JSON-RPC notification object (no `id`).
pub fn to_notification_envelope(method: &str, params: &impl Serialize) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "a".repeat(150);
        let preview = Notification::truncate_preview(&long);
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS);
    }

    #[test]
    fn preview_leaves_short_body_untouched() {
        let short = "hello world";
        assert_eq!(Notification::truncate_preview(short), short);
    }

    #[test]
    fn envelope_has_no_id_field() {
        let env = to_notification_envelope(NOTIFY_MESSAGE_METHOD, &serde_json::json!({"x": 1}));
        assert!(env.get("id").is_none());
        assert_eq!(env["method"], NOTIFY_MESSAGE_METHOD);
    }
}
