// SPDX-License-Identifier: MIT

//! `subscriptions.*` (spec.md §3 "Subscription", §4.6 "Dispatcher").

use serde::Deserialize;
use thrum_core::event::SubscriptionPayload;
use thrum_core::{Event, Scope, SessionId, SubscriptionId, ThrumError};

use super::{parse, to_json, HandlerContext, HandlerResult};

#[derive(Deserialize, Default)]
struct SubscribeParams {
    session_id: String,
    #[serde(default)]
    scope: Option<Scope>,
    #[serde(default)]
    mention_role: Option<String>,
    #[serde(default)]
    all: bool,
}

pub fn subscribe(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: SubscribeParams = parse(params)?;
    let session_id = SessionId::from_string(&p.session_id);

    let session = ctx.state.read(|s| s.get_session(&session_id))?.ok_or_else(|| ThrumError::NotFound(format!("session {} does not exist", p.session_id)))?;
    if !session.is_active() {
        return Err(ThrumError::StateIllegal(format!("session {} has already ended", p.session_id)));
    }
    if !p.all && p.scope.is_none() && p.mention_role.is_none() {
        return Err(ThrumError::Validation("subscribe requires scope, mention_role, or all".into()));
    }

    let subscription_id = SubscriptionId::new();
    ctx.state.write(|s| {
        s.commit(Event::SubscriptionAdd(SubscriptionPayload {
            subscription_id: subscription_id.clone(),
            session_id: session_id.clone(),
            scope: p.scope,
            mention_role: p.mention_role,
            all: p.all,
        }))
    })?;

    to_json(serde_json::json!({ "subscription_id": subscription_id.as_str() }))
}

#[derive(Deserialize)]
struct UnsubscribeParams {
    session_id: String,
    subscription_id: String,
}

pub fn unsubscribe(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: UnsubscribeParams = parse(params)?;
    let session_id = SessionId::from_string(&p.session_id);
    let subscription_id = SubscriptionId::from_string(&p.subscription_id);

    ctx.state.write(|s| s.commit(Event::SubscriptionRemove { session_id: session_id.clone(), subscription_id: subscription_id.clone() }))?;
    to_json(serde_json::json!({ "removed": true }))
}

#[derive(Deserialize)]
struct ListParams {
    session_id: String,
}

pub fn list(ctx: &HandlerContext, params: Option<serde_json::Value>) -> HandlerResult {
    let p: ListParams = parse(params)?;
    let session_id = SessionId::from_string(&p.session_id);
    let subscriptions = ctx.state.read(|s| s.list_subscriptions_for_session(&session_id))?;
    let views: Vec<_> = subscriptions.into_iter().map(|(id, sub)| serde_json::json!({ "subscription_id": id.as_str(), "subscription": sub })).collect();
    to_json(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatcher::Registry;
    use crate::state::StateLock;
    use std::sync::Arc;
    use std::time::Instant;
    use thrum_core::event::{AgentRegisterPayload, AgentRegisterReason, SessionStartPayload};
    use thrum_core::AgentId;

    fn fresh_ctx() -> HandlerContext {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().to_path_buf())).unwrap();
        std::mem::forget(dir);
        let state = StateLock::open(&config, "test-daemon").unwrap();
        HandlerContext { state, registry: Registry::new(), config: Arc::new(config), start_time: Instant::now(), transport: super::super::TransportKind::Unix }
    }

    fn register_and_start(ctx: &HandlerContext) -> SessionId {
        let agent_id = AgentId::from_string("agent:implementer:core:111111111111");
        let session_id = SessionId::new();
        ctx.state
            .write(|s| {
                s.commit(Event::AgentRegister(AgentRegisterPayload {
                    agent_id: agent_id.clone(),
                    role: "implementer".into(),
                    module: "core".into(),
                    display: None,
                    hostname: None,
                    reason: AgentRegisterReason::Normal,
                }))?;
                s.commit(Event::SessionStart(SessionStartPayload { session_id: session_id.clone(), agent_id }))
            })
            .unwrap();
        session_id
    }

    #[test]
    fn subscribing_with_no_filter_and_no_all_is_rejected() {
        let ctx = fresh_ctx();
        let session_id = register_and_start(&ctx);
        let err = subscribe(&ctx, Some(serde_json::json!({"session_id": session_id.as_str()}))).unwrap_err();
        assert!(matches!(err, ThrumError::Validation(_)));
    }

    #[test]
    fn unsubscribing_removes_it_from_the_list() {
        let ctx = fresh_ctx();
        let session_id = register_and_start(&ctx);
        let sub = subscribe(&ctx, Some(serde_json::json!({"session_id": session_id.as_str(), "all": true}))).unwrap();
        let subscription_id = sub["subscription_id"].as_str().unwrap().to_string();

        unsubscribe(&ctx, Some(serde_json::json!({"session_id": session_id.as_str(), "subscription_id": subscription_id}))).unwrap();

        let list = list(&ctx, Some(serde_json::json!({"session_id": session_id.as_str()}))).unwrap();
        assert_eq!(list.as_array().unwrap().len(), 0);
    }
}
