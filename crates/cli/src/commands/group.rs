// SPDX-License-Identifier: MIT

//! `thrum group ...` → `group.*` (spec.md §6).

use anyhow::Result;
use clap::Subcommand;

use crate::client::DaemonClient;

#[derive(Subcommand)]
pub enum GroupCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        created_by: String,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        #[arg(long)]
        group_id: String,
    },
    /// Add a member: `--member-type agent --member-value agent:...` or
    /// `--member-type role --member-value implementer`.
    MemberAdd {
        #[arg(long)]
        group_id: String,
        #[arg(long)]
        member_type: String,
        #[arg(long)]
        member_value: String,
        #[arg(long)]
        added_by: Option<String>,
    },
    MemberRemove {
        #[arg(long)]
        group_id: String,
        #[arg(long)]
        member_type: String,
        #[arg(long)]
        member_value: String,
    },
    List,
    Info {
        #[arg(long)]
        group_id: String,
    },
    Members {
        #[arg(long)]
        group_id: String,
    },
}

pub async fn run(client: &mut DaemonClient, cmd: GroupCommand) -> Result<serde_json::Value> {
    let (method, params) = match cmd {
        GroupCommand::Create { name, created_by, description } => {
            ("group.create", serde_json::json!({ "name": name, "created_by": created_by, "description": description }))
        }
        GroupCommand::Delete { group_id } => ("group.delete", serde_json::json!({ "group_id": group_id })),
        GroupCommand::MemberAdd { group_id, member_type, member_value, added_by } => (
            "group.member.add",
            serde_json::json!({ "group_id": group_id, "member_type": member_type, "member_value": member_value, "added_by": added_by }),
        ),
        GroupCommand::MemberRemove { group_id, member_type, member_value } => {
            ("group.member.remove", serde_json::json!({ "group_id": group_id, "member_type": member_type, "member_value": member_value }))
        }
        GroupCommand::List => ("group.list", serde_json::Value::Null),
        GroupCommand::Info { group_id } => ("group.info", serde_json::json!({ "group_id": group_id })),
        GroupCommand::Members { group_id } => ("group.members", serde_json::json!({ "group_id": group_id })),
    };
    Ok(client.call(method, Some(params)).await?)
}
