// SPDX-License-Identifier: MIT

//! `thrum message ...` → `message.*` (spec.md §6).

use anyhow::{bail, Result};
use clap::Subcommand;

use crate::client::DaemonClient;

#[derive(Subcommand)]
pub enum MessageCommand {
    /// Send a message, optionally mentioning `@agent`/`@role`/`@group` names.
    Send {
        #[arg(long)]
        agent_id: String,
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        body: String,
        #[arg(long, default_value = "plain")]
        body_format: String,
        /// Repeatable `@name` mention (spec.md §4.3).
        #[arg(long = "mention")]
        mentions: Vec<String>,
        /// Repeatable `kind:value` scope, e.g. `module:core`.
        #[arg(long = "scope")]
        scopes: Vec<String>,
        #[arg(long)]
        reply_to: Option<String>,
        #[arg(long)]
        thread_id: Option<String>,
        /// Author under a different `agent:*` identity (caller must be `user:*`).
        #[arg(long)]
        acting_as: Option<String>,
        #[arg(long)]
        disclose: bool,
    },
    /// Fetch one message by id.
    Get {
        #[arg(long)]
        message_id: String,
    },
    /// List an agent's inbox, or a thread's messages.
    List {
        #[arg(long)]
        for_agent: Option<String>,
        #[arg(long)]
        for_agent_role: Option<String>,
        #[arg(long)]
        thread_id: Option<String>,
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(long)]
        sort_order: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    /// Edit the author's own message body.
    Edit {
        #[arg(long)]
        message_id: String,
        #[arg(long)]
        editor_agent_id: String,
        #[arg(long)]
        body: String,
    },
    /// Soft-delete a message.
    Delete {
        #[arg(long)]
        message_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Mark a message read for one session.
    MarkRead {
        #[arg(long)]
        message_id: String,
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        agent_id: String,
    },
    /// Hard-delete and archive matching messages to `.thrum/archive/`.
    Archive {
        #[arg(long)]
        agent_id: Option<String>,
        /// `kind:value`, e.g. `group:reviewers`.
        #[arg(long)]
        scope: Option<String>,
    },
    /// Hard-delete every message with the given scope.
    DeleteByScope {
        /// `kind:value`, e.g. `group:reviewers`.
        #[arg(long)]
        scope: String,
    },
    /// Hard-delete every message authored by an agent.
    DeleteByAgent {
        #[arg(long)]
        agent_id: String,
    },
}

/// Parses a `kind:value` string into the tagged-enum JSON shape `Scope`
/// deserializes from (`{"kind": ..., "value": ...}`, see thrum-core).
fn parse_scope(raw: &str) -> Result<serde_json::Value> {
    let Some((kind, value)) = raw.split_once(':') else {
        bail!("scope must be `kind:value`, e.g. `module:core`, got `{raw}`");
    };
    Ok(serde_json::json!({ "kind": kind, "value": value }))
}

pub async fn run(client: &mut DaemonClient, cmd: MessageCommand) -> Result<serde_json::Value> {
    let (method, params) = match cmd {
        MessageCommand::Send { agent_id, session_id, body, body_format, mentions, scopes, reply_to, thread_id, acting_as, disclose } => {
            let scopes = scopes.iter().map(|s| parse_scope(s)).collect::<Result<Vec<_>>>()?;
            (
                "message.send",
                serde_json::json!({
                    "agent_id": agent_id, "session_id": session_id, "body_content": body,
                    "body_format": body_format, "mentions": mentions, "scopes": scopes,
                    "reply_to": reply_to, "thread_id": thread_id, "acting_as": acting_as, "disclose": disclose,
                }),
            )
        }
        MessageCommand::Get { message_id } => ("message.get", serde_json::json!({ "message_id": message_id })),
        MessageCommand::List { for_agent, for_agent_role, thread_id, sort_by, sort_order, page, page_size } => (
            "message.list",
            serde_json::json!({
                "for_agent": for_agent, "for_agent_role": for_agent_role, "thread_id": thread_id,
                "sort_by": sort_by, "sort_order": sort_order, "page": page, "page_size": page_size,
            }),
        ),
        MessageCommand::Edit { message_id, editor_agent_id, body } => {
            ("message.edit", serde_json::json!({ "message_id": message_id, "editor_agent_id": editor_agent_id, "body_content": body }))
        }
        MessageCommand::Delete { message_id, reason } => ("message.delete", serde_json::json!({ "message_id": message_id, "reason": reason })),
        MessageCommand::MarkRead { message_id, session_id, agent_id } => {
            ("message.markRead", serde_json::json!({ "message_id": message_id, "session_id": session_id, "agent_id": agent_id }))
        }
        MessageCommand::Archive { agent_id, scope } => {
            let scope = scope.as_deref().map(parse_scope).transpose()?;
            ("message.archive", serde_json::json!({ "agent_id": agent_id, "scope": scope }))
        }
        MessageCommand::DeleteByScope { scope } => ("message.deleteByScope", serde_json::json!({ "scope": parse_scope(&scope)? })),
        MessageCommand::DeleteByAgent { agent_id } => ("message.deleteByAgent", serde_json::json!({ "agent_id": agent_id })),
    };
    Ok(client.call(method, Some(params)).await?)
}
