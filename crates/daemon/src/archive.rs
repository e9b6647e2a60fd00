// SPDX-License-Identifier: MIT

//! `message.archive` (spec.md §4.5/§6, §9 open question on dual matches).
//!
//! Writes one JSONL record per archived message to
//! `<repo>/.thrum/archive/<identifier>.jsonl` with mode 0600, then hard-
//! deletes exactly those rows — in that order, so a crash between the two
//! leaves an over-complete archive file (messages archived but not yet
//! deleted) rather than a silently lost message.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thrum_core::{AgentId, Message, Scope, ThrumError};

use crate::state::StateLock;

/// Which match arm produced the messages being archived. Per spec.md §9:
/// when a message matches both an `agent_id` archive and a `scope` archive,
/// only the chosen arm's matches participate in *this* call — the other
/// arm's matches are untouched.
pub enum ArchiveSelector {
    ByAgent(AgentId),
    ByScope(Scope),
}

impl ArchiveSelector {
    fn identifier(&self) -> String {
        match self {
            ArchiveSelector::ByAgent(agent_id) => agent_id.as_str().replace(':', "_"),
            ArchiveSelector::ByScope(scope) => format!("{}_{}", scope.kind_str(), scope.value()),
        }
    }
}

#[derive(Serialize)]
struct ArchiveRecord {
    message_id: String,
    agent_id: String,
    created_at: chrono::DateTime<chrono::Utc>,
    body: ArchiveBody,
    scopes: Vec<thrum_core::Scope>,
    refs: Vec<thrum_core::Ref>,
}

#[derive(Serialize)]
struct ArchiveBody {
    format: &'static str,
    content: String,
}

/// Archives and hard-deletes every message matching `selector`. Returns the
/// number of messages archived.
pub fn archive(state: &StateLock, archive_dir: &Path, selector: ArchiveSelector) -> Result<usize, ThrumError> {
    let path = archive_path(archive_dir, &selector);

    // Snapshot the candidates under the write lock (so nothing else can
    // insert a conflicting message between the snapshot and the delete),
    // write the archive file, then delete exactly those ids. Hard-deleting
    // bypasses the event log entirely: the archive file itself is the
    // durable record of what these messages were, and replaying the log
    // must not resurrect a message whose archival already happened (see
    // DESIGN.md).
    state
        .write(|s| {
            let candidates = match &selector {
                ArchiveSelector::ByAgent(agent_id) => s.store.find_messages_by_agent(agent_id)?,
                ArchiveSelector::ByScope(scope) => s.store.find_messages_by_scope(scope)?,
            };
            if candidates.is_empty() {
                return Ok(0);
            }

            write_archive_file(&path, &candidates)?;

            let ids: Vec<_> = candidates.iter().map(|m| m.message_id.clone()).collect();
            s.store.delete_messages_by_ids(&ids)?;
            Ok(candidates.len())
        })
        .map_err(Into::into)
}

fn archive_path(archive_dir: &Path, selector: &ArchiveSelector) -> PathBuf {
    archive_dir.join(format!("{}.jsonl", selector.identifier()))
}

fn write_archive_file(path: &Path, messages: &[Message]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    for message in messages {
        let record = ArchiveRecord {
            message_id: message.message_id.as_str().to_string(),
            agent_id: message.agent_id.as_str().to_string(),
            created_at: message.created_at,
            body: ArchiveBody { format: message.body_format.as_str(), content: message.body_content.clone() },
            scopes: message.scopes.clone(),
            refs: message.refs.clone(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    Ok(())
}
