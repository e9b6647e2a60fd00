// SPDX-License-Identifier: MIT

//! Per-session git/task context (spec.md §3 "AgentWorkContext").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{AgentId, SessionId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentWorkContext {
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub branch: Option<String>,
    pub worktree_path: Option<String>,
    pub unmerged_commits: Vec<String>,
    pub uncommitted_files: Vec<String>,
    pub changed_files: Vec<String>,
    pub file_changes: Vec<FileChange>,
    pub git_updated_at: DateTime<Utc>,
    pub current_task: Option<String>,
    pub task_updated_at: Option<DateTime<Utc>>,
    pub intent: Option<String>,
    pub intent_updated_at: Option<DateTime<Utc>>,
}

impl AgentWorkContext {
    pub fn empty(session_id: SessionId, agent_id: AgentId, at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            agent_id,
            branch: None,
            worktree_path: None,
            unmerged_commits: Vec::new(),
            uncommitted_files: Vec::new(),
            changed_files: Vec::new(),
            file_changes: Vec::new(),
            git_updated_at: at,
            current_task: None,
            task_updated_at: None,
            intent: None,
            intent_updated_at: None,
        }
    }
}

/// Opaque collaborator (spec.md §1): extracts branch/commit/diff info for a
/// worktree. Out of scope for the core daemon — git plumbing lives outside
/// this crate; this trait is the only contract the core depends on.
pub trait WorkContextExtractor: Send + Sync {
    /// Extract the current git state for `worktree_path`. Errors are logged
    /// and swallowed by the caller (spec.md §7): a failed extraction never
    /// fails the heartbeat that triggered it.
    fn extract(&self, worktree_path: &str) -> Result<GitSnapshot, WorkContextError>;
}

#[derive(Debug, Clone, Default)]
pub struct GitSnapshot {
    pub branch: Option<String>,
    pub unmerged_commits: Vec<String>,
    pub uncommitted_files: Vec<String>,
    pub changed_files: Vec<String>,
    pub file_changes: Vec<FileChange>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkContextError {
    #[error("git extraction timed out")]
    Timeout,
    #[error("git extraction failed: {0}")]
    Failed(String),
}

/// A `WorkContextExtractor` that never produces data — used when no git
/// plumbing collaborator is wired in (e.g. tests, or a bare worktree-less
/// deployment). Matches spec.md §7's "external errors are logged and
/// swallowed" contract by simply reporting nothing to extract.
pub struct NullWorkContextExtractor;

impl WorkContextExtractor for NullWorkContextExtractor {
    fn extract(&self, _worktree_path: &str) -> Result<GitSnapshot, WorkContextError> {
        Ok(GitSnapshot::default())
    }
}
