// SPDX-License-Identifier: MIT

//! `thrum context ...` → `context.*`/`preamble.*` (spec.md §6).

use anyhow::Result;
use clap::Subcommand;

use crate::client::DaemonClient;

#[derive(Subcommand)]
pub enum ContextCommand {
    Save {
        #[arg(long)]
        agent_id: String,
        #[arg(long)]
        content: String,
    },
    Show {
        #[arg(long)]
        agent_id: String,
    },
    Clear {
        #[arg(long)]
        agent_id: String,
    },
    SavePreamble {
        #[arg(long)]
        agent_id: String,
        #[arg(long)]
        content: String,
    },
    ShowPreamble {
        #[arg(long)]
        agent_id: String,
    },
}

pub async fn run(client: &mut DaemonClient, cmd: ContextCommand) -> Result<serde_json::Value> {
    let (method, params) = match cmd {
        ContextCommand::Save { agent_id, content } => ("context.save", serde_json::json!({ "agent_id": agent_id, "content": content })),
        ContextCommand::Show { agent_id } => ("context.show", serde_json::json!({ "agent_id": agent_id })),
        ContextCommand::Clear { agent_id } => ("context.clear", serde_json::json!({ "agent_id": agent_id })),
        ContextCommand::SavePreamble { agent_id, content } => ("preamble.save", serde_json::json!({ "agent_id": agent_id, "content": content })),
        ContextCommand::ShowPreamble { agent_id } => ("preamble.show", serde_json::json!({ "agent_id": agent_id })),
    };
    Ok(client.call(method, Some(params)).await?)
}
