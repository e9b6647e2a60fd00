// SPDX-License-Identifier: MIT

//! Mention routing (spec.md §4.3): turns the `@name`s in an outgoing
//! message into the `(scopes, refs)` pairs `thrum-storage` persists.
//!
//! Grounded in the teacher's `router` package (classifies a job target
//! before dispatch), adapted here to classify each mention independently
//! and accumulate unknowns instead of failing fast on the first miss — a
//! send should report every bad `@name` at once, not just the first.

use thrum_core::{MessageId, Ref, Scope, ThrumError};

use crate::group_resolver::{resolve, Resolved};
use crate::state::StateLock;

/// What [`route`] produces: scopes/refs ready to attach to the message plus
/// any non-fatal warnings (a group mention isn't an unknown-recipient error,
/// but it's worth telling the caller it wasn't routed to an individual).
#[derive(Debug, Default)]
pub struct RoutedMentions {
    pub scopes: Vec<Scope>,
    pub refs: Vec<Ref>,
    pub resolved_count: usize,
    pub warnings: Vec<String>,
}

/// Classifies every `@name` in `mentions` per spec.md §4.3's order: group,
/// then agent-or-role, then unknown. Fails the whole call if any mention is
/// unknown — "nothing is appended" on failure, so the caller must discard
/// a partial `RoutedMentions` rather than persist it.
pub fn route(state: &StateLock, mentions: &[String]) -> Result<RoutedMentions, ThrumError> {
    let mut routed = RoutedMentions::default();
    let mut unknown = Vec::new();

    for raw in mentions {
        let name = raw.strip_prefix('@').unwrap_or(raw);
        let resolved = resolve(state, name).map_err(|e| ThrumError::Internal(e.to_string()))?;

        match resolved {
            Resolved::Group(_) => {
                routed.scopes.push(Scope::Group(name.to_string()));
                routed.refs.push(Ref::Group(name.to_string()));
                routed.resolved_count += 1;
                if name != thrum_core::EVERYONE_GROUP_NAME {
                    routed.warnings.push(format!("@{name} resolved to a group, not an individual agent"));
                }
            }
            Resolved::Agents(_) => {
                routed.refs.push(Ref::Mention(name.to_string()));
                routed.resolved_count += 1;
            }
            Resolved::Unknown => unknown.push(format!("@{name}")),
        }
    }

    if !unknown.is_empty() {
        return Err(ThrumError::UnknownRecipients(format!("{} — no matching agent, role, or group found", unknown.join(", "))));
    }

    Ok(routed)
}

/// Validates a `reply_to` id against the store and, on success, returns the
/// `ref(reply_to, id)` to append (spec.md §4.3 "Reply handling").
pub fn route_reply_to(state: &StateLock, reply_to: &MessageId) -> Result<Ref, ThrumError> {
    let exists = state
        .read(|store| store.get_message(reply_to).map(|m| m.is_some()))
        .map_err(|e| ThrumError::Internal(e.to_string()))?;
    if !exists {
        return Err(ThrumError::Validation(format!("reply_to {} does not reference an existing message", reply_to.as_str())));
    }
    Ok(Ref::ReplyTo(reply_to.clone()))
}
