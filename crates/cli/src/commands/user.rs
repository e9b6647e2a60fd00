// SPDX-License-Identifier: MIT

//! `thrum user ...` → `user.*` (spec.md §6). Both methods are reachable only
//! over a WebSocket connection for `user.register`; this client always dials
//! the Unix socket, so `register` exists here to exercise and document the
//! `-32001` transport-restriction path, not as a usable login flow.

use anyhow::Result;
use clap::Subcommand;

use crate::client::DaemonClient;

#[derive(Subcommand)]
pub enum UserCommand {
    Identify {
        #[arg(long)]
        username: String,
    },
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        display: Option<String>,
    },
}

pub async fn run(client: &mut DaemonClient, cmd: UserCommand) -> Result<serde_json::Value> {
    let (method, params) = match cmd {
        UserCommand::Identify { username } => ("user.identify", serde_json::json!({ "username": username })),
        UserCommand::Register { username, display } => ("user.register", serde_json::json!({ "username": username, "display": display })),
    };
    Ok(client.call(method, Some(params)).await?)
}
