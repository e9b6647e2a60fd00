// SPDX-License-Identifier: MIT

//! RPC method dispatch (spec.md §6, §9 "Dynamic dispatch"): one function per
//! method, a single match from method name to function, thin façades over
//! `Store`/`Router`/`Dispatcher` that emit the corresponding event through
//! `StateLock::write`.

pub mod agent;
pub mod context;
pub mod group;
pub mod health;
pub mod message;
pub mod session;
pub mod subscription;
pub mod sync;
pub mod team;
pub mod thread;
pub mod user;

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use thrum_core::ThrumError;
use thrum_wire::RpcError;

use crate::config::Config;
use crate::dispatcher::Registry;
use crate::state::StateLock;

/// Which transport a request arrived on. `user.register` is WebSocket-only;
/// `sync.*` is restricted to a peer-token whitelist (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Unix,
    WebSocket,
}

/// Everything a handler needs, bundled once per connection and cheap to
/// clone (an `Arc` bump plus a couple of handles already designed to be
/// shared: `StateLock` and `Registry`).
#[derive(Clone)]
pub struct HandlerContext {
    pub state: StateLock,
    pub registry: Registry,
    pub config: Arc<Config>,
    pub start_time: Instant,
    pub transport: TransportKind,
}

pub type HandlerResult = Result<serde_json::Value, ThrumError>;

/// Methods restricted to a WebSocket connection (spec.md §6: "Required for
/// `user.register`").
const WEBSOCKET_ONLY: &[&str] = &["user.register"];

/// Peer-replication methods, gated behind `THRUM_PEER_TOKEN` regardless of
/// transport (spec.md §6 "restricted to a whitelist", §9).
const SYNC_METHODS: &[&str] = &["sync.pull", "sync.peer_info", "sync.notify"];

fn parse<P: DeserializeOwned>(params: Option<serde_json::Value>) -> Result<P, ThrumError> {
    serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| ThrumError::Validation(format!("invalid params: {e}")))
}

/// Serializes a handler's result type into the wire payload. The only way
/// this can fail is a type whose `Serialize` impl itself errors (none of
/// thrum's do), but the result still has to go somewhere.
fn to_json<T: serde::Serialize>(value: T) -> Result<serde_json::Value, ThrumError> {
    serde_json::to_value(value).map_err(|e| ThrumError::Internal(e.to_string()))
}

/// Dispatches one JSON-RPC call to its handler, applying transport
/// restrictions before the method even looks at `params`.
pub fn dispatch(ctx: &HandlerContext, method: &str, params: Option<serde_json::Value>) -> Result<serde_json::Value, RpcError> {
    if WEBSOCKET_ONLY.contains(&method) && ctx.transport != TransportKind::WebSocket {
        return Err(RpcError::transport_restricted(method));
    }
    if SYNC_METHODS.contains(&method) && !sync::peer_token_valid(params.as_ref()) {
        return Err(RpcError::transport_restricted(method));
    }

    let Some(result) = route(ctx, method, params) else {
        return Err(RpcError::method_not_found(method));
    };
    result.map_err(Into::into)
}

fn route(ctx: &HandlerContext, method: &str, params: Option<serde_json::Value>) -> Option<HandlerResult> {
    Some(match method {
        "agent.register" => agent::register(ctx, params),
        "agent.list" => agent::list(ctx, params),
        "agent.whoami" => agent::whoami(ctx, params),
        "agent.listContext" => agent::list_context(ctx, params),
        "agent.delete" => agent::delete(ctx, params),
        "agent.cleanup" => agent::cleanup(ctx, params),

        "session.start" => session::start(ctx, params),
        "session.end" => session::end(ctx, params),
        "session.heartbeat" => session::heartbeat(ctx, params),
        "session.setIntent" => session::set_intent(ctx, params),
        "session.setTask" => session::set_task(ctx, params),
        "session.list" => session::list(ctx, params),

        "message.send" => message::send(ctx, params),
        "message.get" => message::get(ctx, params),
        "message.list" => message::list(ctx, params),
        "message.edit" => message::edit(ctx, params),
        "message.delete" => message::delete(ctx, params),
        "message.markRead" => message::mark_read(ctx, params),
        "message.archive" => message::archive(ctx, params),
        "message.deleteByScope" => message::delete_by_scope(ctx, params),
        "message.deleteByAgent" => message::delete_by_agent(ctx, params),

        "thread.create" => thread::create(ctx, params),
        "thread.list" => thread::list(ctx, params),
        "thread.get" => thread::get(ctx, params),

        "group.create" => group::create(ctx, params),
        "group.delete" => group::delete(ctx, params),
        "group.member.add" => group::member_add(ctx, params),
        "group.member.remove" => group::member_remove(ctx, params),
        "group.list" => group::list(ctx, params),
        "group.info" => group::info(ctx, params),
        "group.members" => group::members(ctx, params),

        "subscriptions.subscribe" => subscription::subscribe(ctx, params),
        "subscriptions.unsubscribe" => subscription::unsubscribe(ctx, params),
        "subscriptions.list" => subscription::list(ctx, params),

        "context.save" => context::save(ctx, params),
        "context.show" => context::show(ctx, params),
        "context.clear" => context::clear(ctx, params),
        "preamble.save" => context::save_preamble(ctx, params),
        "preamble.show" => context::show_preamble(ctx, params),

        "user.identify" => user::identify(ctx, params),
        "user.register" => user::register(ctx, params),

        "team.list" => team::list(ctx, params),

        "health" => health::health(ctx, params),

        "sync.pull" => sync::pull(ctx, params),
        "sync.peer_info" => sync::peer_info(ctx, params),
        "sync.notify" => sync::notify(ctx, params),

        _ => return None,
    })
}
