// SPDX-License-Identifier: MIT

//! `thrum agent ...` → `agent.*` (spec.md §6).

use anyhow::Result;
use clap::Subcommand;

use crate::client::DaemonClient;

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Register this process's identity (spec.md §3 "Agent").
    Register {
        #[arg(long)]
        role: String,
        #[arg(long)]
        module: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        display: Option<String>,
        #[arg(long)]
        hostname: Option<String>,
        /// Evict a conflicting `(role, module)` occupant instead of failing.
        #[arg(long)]
        force: bool,
        /// Update an existing conflicting occupant in place.
        #[arg(long)]
        re_register: bool,
    },
    /// List every registered agent.
    List,
    /// Look up one agent by id.
    Whoami {
        #[arg(long)]
        agent_id: String,
    },
    /// List agent names that have a saved context file.
    ListContext,
    /// Deregister an agent.
    Delete {
        #[arg(long)]
        agent_id: String,
    },
    /// Sweep stale agents with no open session (or delete one by id).
    Cleanup {
        #[arg(long)]
        agent_id: Option<String>,
    },
}

pub async fn run(client: &mut DaemonClient, cmd: AgentCommand) -> Result<serde_json::Value> {
    let (method, params) = match cmd {
        AgentCommand::Register { role, module, name, display, hostname, force, re_register } => (
            "agent.register",
            serde_json::json!({
                "role": role, "module": module, "name": name, "display": display,
                "hostname": hostname, "force": force, "re_register": re_register,
            }),
        ),
        AgentCommand::List => ("agent.list", serde_json::Value::Null),
        AgentCommand::Whoami { agent_id } => ("agent.whoami", serde_json::json!({ "agent_id": agent_id })),
        AgentCommand::ListContext => ("agent.listContext", serde_json::Value::Null),
        AgentCommand::Delete { agent_id } => ("agent.delete", serde_json::json!({ "agent_id": agent_id })),
        AgentCommand::Cleanup { agent_id } => ("agent.cleanup", serde_json::json!({ "agent_id": agent_id })),
    };
    Ok(client.call(method, Some(params)).await?)
}
