// SPDX-License-Identifier: MIT

//! Subscription fan-out (spec.md §4.6).
//!
//! Runs after a write transaction commits and without the write lock held
//! (spec.md §5): dispatch takes a snapshot of live subscriptions, matches
//! each against the message that was just written, and pushes to whichever
//! connections are still registered. A session that unsubscribed or
//! disconnected between commit and dispatch simply isn't in the snapshot —
//! that's the registry's job, not a lock's.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thrum_core::{Message, Ref, SessionId};
use thrum_wire::{Notification, ThreadNotification};
use tokio::sync::mpsc::UnboundedSender;

use crate::state::StateLock;

/// One push frame a transport writes to its connection. Transports decide
/// how to frame it on the wire (`notify.message`/`notify.thread`); the
/// dispatcher only decides who receives which.
#[derive(Debug, Clone)]
pub enum Push {
    Message(Notification),
    Thread(ThreadNotification),
}

/// Live connections' push channels, keyed by session. A transport registers
/// its sender on connect and deregisters on disconnect; the dispatcher never
/// owns a connection, only a cheap handle to it.
#[derive(Clone, Default)]
pub struct Registry {
    senders: Arc<RwLock<HashMap<SessionId, UnboundedSender<Push>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session_id: SessionId, sender: UnboundedSender<Push>) {
        self.senders.write().insert(session_id, sender);
    }

    pub fn deregister(&self, session_id: &SessionId) {
        self.senders.write().remove(session_id);
    }

    fn snapshot(&self) -> Vec<(SessionId, UnboundedSender<Push>)> {
        self.senders.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Dispatches a newly committed message to every subscription that matches
/// it. Returns the number of sessions the push was actually delivered to
/// (a full outbound channel, or a session with no registered sender, is
/// skipped silently — best-effort, per spec.md §4.6).
pub fn dispatch_for_message(state: &StateLock, registry: &Registry, message: &Message) -> Result<usize, thrum_storage::StorageError> {
    let subscriptions = state.read(|store| store.list_all_subscriptions())?;
    let mentions: Vec<&str> = message
        .refs
        .iter()
        .filter_map(|r| match r {
            Ref::Mention(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();

    let notification = Notification {
        message_id: message.message_id.clone(),
        thread_id: message.thread_id.clone(),
        agent_id: message.agent_id.clone(),
        preview: Notification::truncate_preview(&message.body_content),
        scopes: message.scopes.clone(),
        refs: message.refs.clone(),
        timestamp: message.created_at,
    };

    let live = registry.snapshot();
    let mut delivered_sessions = std::collections::HashSet::new();
    let mut fanout = 0;

    for (subscription_id, subscription) in &subscriptions {
        let _ = subscription_id;
        if !subscription.matches(&message.scopes, &mentions) {
            continue;
        }
        // Matches dedupe per session (spec.md §4.6): a session with two
        // matching subscriptions still gets exactly one push.
        if !delivered_sessions.insert(subscription.session_id.clone()) {
            continue;
        }
        if let Some((_, sender)) = live.iter().find(|(sid, _)| *sid == subscription.session_id) {
            if sender.send(Push::Message(notification.clone())).is_ok() {
                fanout += 1;
            }
        }
    }

    Ok(fanout)
}

/// Dispatches a thread-updated notification (spec.md §4.6
/// `DispatchThreadUpdated`). Threads carry no scope of their own, so the
/// only subscription that can match one is the `all` firehose.
pub fn dispatch_thread_updated(state: &StateLock, registry: &Registry, notification: ThreadNotification) -> Result<usize, thrum_storage::StorageError> {
    let subscriptions = state.read(|store| store.list_all_subscriptions())?;
    let live = registry.snapshot();
    let mut fanout = 0;

    for (_, subscription) in &subscriptions {
        if !subscription.all {
            continue;
        }
        if let Some((_, sender)) = live.iter().find(|(sid, _)| *sid == subscription.session_id) {
            if sender.send(Push::Thread(notification.clone())).is_ok() {
                fanout += 1;
            }
        }
    }

    Ok(fanout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use thrum_core::event::{AgentRegisterPayload, AgentRegisterReason, SubscriptionPayload};
    use thrum_core::{AgentId, BodyFormat, Event, MessageId, SessionId as CoreSessionId};

    fn fresh_state() -> StateLock {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(Some(dir.path().to_path_buf())).unwrap();
        std::mem::forget(dir);
        StateLock::open(&cfg, "test-daemon").unwrap()
    }

    fn register_agent(state: &StateLock, agent_id: &str) {
        state
            .write(|s| {
                s.commit(Event::AgentRegister(AgentRegisterPayload {
                    agent_id: AgentId::from_string(agent_id),
                    role: "implementer".into(),
                    module: "core".into(),
                    display: None,
                    hostname: None,
                    reason: AgentRegisterReason::Normal,
                }))
            })
            .unwrap();
    }

    #[test]
    fn firehose_subscription_receives_every_message() {
        let state = fresh_state();
        register_agent(&state, "agent:implementer:core:111111111111");
        let session_id = CoreSessionId::new();

        state
            .write(|s| {
                s.commit(Event::SubscriptionAdd(SubscriptionPayload {
                    subscription_id: thrum_core::SubscriptionId::new(),
                    session_id: session_id.clone(),
                    scope: None,
                    mention_role: None,
                    all: true,
                }))
            })
            .unwrap();

        let registry = Registry::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        registry.register(session_id.clone(), tx);

        let message = Message {
            message_id: MessageId::new(),
            thread_id: None,
            agent_id: AgentId::from_string("agent:implementer:core:111111111111"),
            session_id,
            created_at: chrono::Utc::now(),
            updated_at: None,
            deleted: false,
            deleted_at: None,
            delete_reason: None,
            body_format: BodyFormat::Plain,
            body_content: "hello".into(),
            body_structured: None,
            authored_by: None,
            disclosed: false,
            scopes: vec![],
            refs: vec![],
        };

        let fanout = dispatch_for_message(&state, &registry, &message).unwrap();
        assert_eq!(fanout, 1);
        assert!(matches!(rx.try_recv(), Ok(Push::Message(_))));
    }

    #[test]
    fn deregistered_session_receives_nothing() {
        let state = fresh_state();
        register_agent(&state, "agent:implementer:core:111111111111");
        let session_id = CoreSessionId::new();
        state
            .write(|s| {
                s.commit(Event::SubscriptionAdd(SubscriptionPayload {
                    subscription_id: thrum_core::SubscriptionId::new(),
                    session_id: session_id.clone(),
                    scope: None,
                    mention_role: None,
                    all: true,
                }))
            })
            .unwrap();

        let registry = Registry::new();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        registry.register(session_id.clone(), tx);
        registry.deregister(&session_id);

        let message = Message {
            message_id: MessageId::new(),
            thread_id: None,
            agent_id: AgentId::from_string("agent:implementer:core:111111111111"),
            session_id,
            created_at: chrono::Utc::now(),
            updated_at: None,
            deleted: false,
            deleted_at: None,
            delete_reason: None,
            body_format: BodyFormat::Plain,
            body_content: "hello".into(),
            body_structured: None,
            authored_by: None,
            disclosed: false,
            scopes: vec![],
            refs: vec![],
        };

        let fanout = dispatch_for_message(&state, &registry, &message).unwrap();
        assert_eq!(fanout, 0);
    }
}
