// SPDX-License-Identifier: MIT

//! `thrum session ...` → `session.*` (spec.md §6).

use anyhow::Result;
use clap::Subcommand;

use crate::client::DaemonClient;

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Start a session for an already-registered agent.
    Start {
        #[arg(long)]
        agent_id: String,
    },
    /// End an active session.
    End {
        #[arg(long)]
        session_id: String,
    },
    /// Refresh `last_seen_at`; optionally reports a worktree to refresh the
    /// session's work context from (spec.md §4.7).
    Heartbeat {
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        worktree_path: Option<String>,
    },
    /// Record the agent's current high-level intent.
    SetIntent {
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        intent: String,
    },
    /// Record the agent's current task description.
    SetTask {
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        task: String,
    },
    /// List sessions (every open session, or every session for one agent).
    List {
        #[arg(long)]
        agent_id: Option<String>,
    },
}

pub async fn run(client: &mut DaemonClient, cmd: SessionCommand) -> Result<serde_json::Value> {
    let (method, params) = match cmd {
        SessionCommand::Start { agent_id } => ("session.start", serde_json::json!({ "agent_id": agent_id })),
        SessionCommand::End { session_id } => ("session.end", serde_json::json!({ "session_id": session_id })),
        SessionCommand::Heartbeat { session_id, worktree_path } => {
            ("session.heartbeat", serde_json::json!({ "session_id": session_id, "worktree_path": worktree_path }))
        }
        SessionCommand::SetIntent { session_id, intent } => {
            ("session.setIntent", serde_json::json!({ "session_id": session_id, "intent": intent }))
        }
        SessionCommand::SetTask { session_id, task } => {
            ("session.setTask", serde_json::json!({ "session_id": session_id, "task": task }))
        }
        SessionCommand::List { agent_id } => ("session.list", serde_json::json!({ "agent_id": agent_id })),
    };
    Ok(client.call(method, Some(params)).await?)
}
