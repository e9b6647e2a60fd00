// SPDX-License-Identifier: MIT

//! `context.save/show/clear`, `preamble.save/show` (spec.md §6:
//! `.thrum/context/<agent_name>.md` and `<agent_name>_preamble.md`).
//!
//! Plain markdown files, one per agent, living outside the event log and
//! the relational store entirely — these are free-form notes an agent
//! leaves for itself or collaborators, not routed or queried structurally.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ContextFileError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn sanitize(agent_id: &str) -> String {
    agent_id.replace(':', "_")
}

fn context_path(context_dir: &Path, agent_id: &str) -> PathBuf {
    context_dir.join(format!("{}.md", sanitize(agent_id)))
}

fn preamble_path(context_dir: &Path, agent_id: &str) -> PathBuf {
    context_dir.join(format!("{}_preamble.md", sanitize(agent_id)))
}

pub fn save_context(context_dir: &Path, agent_id: &str, content: &str) -> Result<(), ContextFileError> {
    std::fs::create_dir_all(context_dir)?;
    std::fs::write(context_path(context_dir, agent_id), content)?;
    Ok(())
}

/// Returns `None` when the agent has never saved context — a missing file
/// is not an error, just an empty context.
pub fn show_context(context_dir: &Path, agent_id: &str) -> Result<Option<String>, ContextFileError> {
    read_optional(&context_path(context_dir, agent_id))
}

pub fn clear_context(context_dir: &Path, agent_id: &str) -> Result<(), ContextFileError> {
    remove_optional(&context_path(context_dir, agent_id))
}

pub fn save_preamble(context_dir: &Path, agent_id: &str, content: &str) -> Result<(), ContextFileError> {
    std::fs::create_dir_all(context_dir)?;
    std::fs::write(preamble_path(context_dir, agent_id), content)?;
    Ok(())
}

pub fn show_preamble(context_dir: &Path, agent_id: &str) -> Result<Option<String>, ContextFileError> {
    read_optional(&preamble_path(context_dir, agent_id))
}

fn read_optional(path: &Path) -> Result<Option<String>, ContextFileError> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn remove_optional(path: &Path) -> Result<(), ContextFileError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Lists every `<agent>.md` context file present, for `agent.listContext`
/// (spec.md §6). Preambles are excluded (`_preamble.md` suffix filtered).
pub fn list_context_agents(context_dir: &Path) -> Result<Vec<String>, ContextFileError> {
    if !context_dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(context_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(stem) = name.strip_suffix(".md") {
            if !stem.ends_with("_preamble") {
                out.push(stem.to_string());
            }
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_show_then_clear_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        save_context(dir.path(), "agent:a:b:c", "hello").unwrap();
        assert_eq!(show_context(dir.path(), "agent:a:b:c").unwrap(), Some("hello".to_string()));

        clear_context(dir.path(), "agent:a:b:c").unwrap();
        assert_eq!(show_context(dir.path(), "agent:a:b:c").unwrap(), None);
    }

    #[test]
    fn preamble_is_a_distinct_file_from_context() {
        let dir = tempfile::tempdir().unwrap();
        save_context(dir.path(), "agent:a:b:c", "context body").unwrap();
        save_preamble(dir.path(), "agent:a:b:c", "preamble body").unwrap();

        assert_eq!(show_context(dir.path(), "agent:a:b:c").unwrap(), Some("context body".to_string()));
        assert_eq!(show_preamble(dir.path(), "agent:a:b:c").unwrap(), Some("preamble body".to_string()));
    }

    #[test]
    fn list_context_agents_excludes_preambles() {
        let dir = tempfile::tempdir().unwrap();
        save_context(dir.path(), "agent:a:b:c", "x").unwrap();
        save_preamble(dir.path(), "agent:a:b:c", "y").unwrap();
        save_context(dir.path(), "agent:d:e:f", "z").unwrap();

        let mut agents = list_context_agents(dir.path()).unwrap();
        agents.sort();
        assert_eq!(agents, vec!["agent_a_b_c".to_string(), "agent_d_e_f".to_string()]);
    }
}
