// SPDX-License-Identifier: MIT

//! `thrum thread ...` → `thread.*` (spec.md §6).

use anyhow::Result;
use clap::Subcommand;

use crate::client::DaemonClient;

#[derive(Subcommand)]
pub enum ThreadCommand {
    Create {
        #[arg(long)]
        created_by: String,
        #[arg(long)]
        title: Option<String>,
    },
    List,
    Get {
        #[arg(long)]
        thread_id: String,
    },
}

pub async fn run(client: &mut DaemonClient, cmd: ThreadCommand) -> Result<serde_json::Value> {
    let (method, params) = match cmd {
        ThreadCommand::Create { created_by, title } => ("thread.create", serde_json::json!({ "created_by": created_by, "title": title })),
        ThreadCommand::List => ("thread.list", serde_json::Value::Null),
        ThreadCommand::Get { thread_id } => ("thread.get", serde_json::json!({ "thread_id": thread_id })),
    };
    Ok(client.call(method, Some(params)).await?)
}
