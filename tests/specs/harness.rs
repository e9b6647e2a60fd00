//! Shared setup for the end-to-end scenario tests (spec.md §8).
//!
//! Drives the daemon the way `crates/daemon`'s own handler tests do — a
//! fresh `tempfile::tempdir()` `.thrum/` directory, `Config::load`,
//! `StateLock::open` — but goes one level up and calls `handlers::dispatch`
//! directly, so a scenario reads as a sequence of RPC calls rather than
//! direct `Store` manipulation. No socket, no process: these exercise the
//! routing/projection/dispatch logic, not the transport.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use thrum_daemon::config::Config;
use thrum_daemon::dispatcher::Registry;
use thrum_daemon::handlers::{dispatch, HandlerContext, TransportKind};
use thrum_daemon::state::StateLock;

pub struct Harness {
    pub ctx: HandlerContext,
}

impl Harness {
    pub fn fresh() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().to_path_buf())).unwrap();
        // Leaked deliberately: the tempdir must outlive every handle this
        // harness hands out, and a scenario test runs for the process's
        // short lifetime anyway (same tradeoff the handler unit tests make).
        std::mem::forget(dir);
        let state = StateLock::open(&config, "specs-harness").unwrap();
        let ctx = HandlerContext { state, registry: Registry::new(), config: Arc::new(config), start_time: Instant::now(), transport: TransportKind::Unix };
        Self { ctx }
    }

    pub fn call(&self, method: &str, params: Value) -> Result<Value, thrum_wire::RpcError> {
        dispatch(&self.ctx, method, Some(params))
    }

    pub fn call_ok(&self, method: &str, params: Value) -> Value {
        self.call(method, params).unwrap_or_else(|e| panic!("{method} failed ({}): {}", e.code, e.message))
    }

    /// Registers an agent and starts a session for it in one step, returning
    /// `(agent_id, session_id)` — the pattern nearly every scenario needs
    /// before it can send or read anything.
    pub fn register_and_start(&self, role: &str, module: &str) -> (String, String) {
        let agent = self.call_ok("agent.register", json!({ "role": role, "module": module }));
        let agent_id = agent["agent_id"].as_str().unwrap().to_string();
        let session = self.call_ok("session.start", json!({ "agent_id": agent_id }));
        let session_id = session["session_id"].as_str().unwrap().to_string();
        (agent_id, session_id)
    }

    pub fn send(&self, agent_id: &str, session_id: &str, body: &str, mentions: &[&str]) -> Result<Value, thrum_wire::RpcError> {
        self.call(
            "message.send",
            json!({
                "agent_id": agent_id,
                "session_id": session_id,
                "body_content": body,
                "mentions": mentions,
            }),
        )
    }

    pub fn inbox(&self, for_agent: &str) -> Value {
        self.call_ok("message.list", json!({ "for_agent": for_agent, "page": 1, "page_size": 50 }))
    }
}
