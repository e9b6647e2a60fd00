// SPDX-License-Identifier: MIT

//! Per-agent identity files (spec.md §6: `.thrum/identities/<agent_name>.json`).
//!
//! The `Store`'s `agents` table is the queryable source of truth; these
//! files exist alongside it as a plain-text artifact a human (or another
//! tool) can read without going through the daemon at all — mirroring the
//! teacher's practice of keeping one durable file per entity under its
//! state directory in addition to the relational projection.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thrum_core::Agent;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("io error writing identity file: {0}")]
    Io(#[from] std::io::Error),
    #[error("serializing identity: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct IdentityFile {
    agent_id: String,
    kind: String,
    role: String,
    module: String,
    display: Option<String>,
    hostname: Option<String>,
    registered_at: chrono::DateTime<chrono::Utc>,
}

fn file_name_for(agent_id: &str) -> String {
    // agent ids contain `:` (agent:role:module:hex); sanitize for a
    // filesystem-safe name rather than reject what derive_agent_id produces.
    format!("{}.json", agent_id.replace(':', "_"))
}

fn path_for(identities_dir: &Path, agent_id: &str) -> PathBuf {
    identities_dir.join(file_name_for(agent_id))
}

/// Writes (or overwrites) the identity file for `agent`. Called whenever the
/// `agents` table gains or updates a row, so the file never drifts from the
/// projection.
pub fn write_identity(identities_dir: &Path, agent: &Agent) -> Result<(), IdentityError> {
    std::fs::create_dir_all(identities_dir)?;
    let file = IdentityFile {
        agent_id: agent.agent_id.as_str().to_string(),
        kind: agent.kind.to_string(),
        role: agent.role.clone(),
        module: agent.module.clone(),
        display: agent.display.clone(),
        hostname: agent.hostname.clone(),
        registered_at: agent.registered_at,
    };
    let contents = serde_json::to_string_pretty(&file)?;
    let path = path_for(identities_dir, agent.agent_id.as_str());
    let mut f = std::fs::File::create(&path)?;
    f.write_all(contents.as_bytes())?;
    Ok(())
}

/// Removes an identity file, if present. A missing file is not an error:
/// `agent.delete` on an agent with no identity file yet is a no-op here.
pub fn remove_identity(identities_dir: &Path, agent_id: &str) -> Result<(), IdentityError> {
    let path = path_for(identities_dir, agent_id);
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
