// SPDX-License-Identifier: MIT

//! `thrum subscription ...` → `subscriptions.*` (spec.md §6).

use anyhow::{bail, Result};
use clap::Subcommand;

use crate::client::DaemonClient;

#[derive(Subcommand)]
pub enum SubscriptionCommand {
    /// Subscribe to the firehose, a scope, or a mentioned role — exactly
    /// one of `--all`, `--scope`, `--mention-role` must be given.
    Subscribe {
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        all: bool,
        /// `kind:value`, e.g. `group:reviewers`.
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        mention_role: Option<String>,
    },
    Unsubscribe {
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        subscription_id: String,
    },
    List {
        #[arg(long)]
        session_id: String,
    },
}

pub async fn run(client: &mut DaemonClient, cmd: SubscriptionCommand) -> Result<serde_json::Value> {
    let (method, params) = match cmd {
        SubscriptionCommand::Subscribe { session_id, all, scope, mention_role } => {
            let scope = match scope {
                Some(raw) => {
                    let Some((kind, value)) = raw.split_once(':') else {
                        bail!("scope must be `kind:value`, e.g. `group:reviewers`, got `{raw}`");
                    };
                    Some(serde_json::json!({ "kind": kind, "value": value }))
                }
                None => None,
            };
            ("subscriptions.subscribe", serde_json::json!({ "session_id": session_id, "all": all, "scope": scope, "mention_role": mention_role }))
        }
        SubscriptionCommand::Unsubscribe { session_id, subscription_id } => {
            ("subscriptions.unsubscribe", serde_json::json!({ "session_id": session_id, "subscription_id": subscription_id }))
        }
        SubscriptionCommand::List { session_id } => ("subscriptions.list", serde_json::json!({ "session_id": session_id })),
    };
    Ok(client.call(method, Some(params)).await?)
}
