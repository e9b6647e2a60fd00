// SPDX-License-Identifier: MIT

//! Git-backed `WorkContextExtractor` (spec.md §4.7): shells out to `git` to
//! read branch, unmerged commits, and working-tree diff stats for a
//! session's worktree.
//!
//! External errors are logged and swallowed by the caller — this module
//! only ever returns `Err` for a genuine timeout or a `git` invocation that
//! fails outright; a worktree with nothing interesting to report (clean,
//! detached HEAD, no upstream) still returns `Ok` with empty fields.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use thrum_core::work_context::{FileChange, GitSnapshot, WorkContextError, WorkContextExtractor};

/// Read-only git queries (status, branch, diff stat) use this deadline.
pub const READ_ONLY_TIMEOUT: Duration = Duration::from_secs(5);
/// Any git operation that may touch the network (none currently; reserved
/// for a future `git fetch --dry-run` style check) uses this deadline.
pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GitCliWorkContextExtractor;

impl WorkContextExtractor for GitCliWorkContextExtractor {
    fn extract(&self, worktree_path: &str) -> Result<GitSnapshot, WorkContextError> {
        let branch = run_git(worktree_path, &["rev-parse", "--abbrev-ref", "HEAD"], READ_ONLY_TIMEOUT)?
            .map(|out| out.trim().to_string())
            .filter(|s| s != "HEAD" && !s.is_empty());

        let unmerged_commits = run_git(worktree_path, &["log", "@{upstream}..HEAD", "--format=%H"], READ_ONLY_TIMEOUT)
            .ok()
            .flatten()
            .map(|out| out.lines().map(str::to_string).collect())
            .unwrap_or_default();

        let status = run_git(worktree_path, &["status", "--porcelain"], READ_ONLY_TIMEOUT)?.unwrap_or_default();
        let uncommitted_files = status.lines().filter_map(|line| line.get(3..).map(str::to_string)).collect();

        let diff_numstat = run_git(worktree_path, &["diff", "--numstat", "HEAD"], READ_ONLY_TIMEOUT)?.unwrap_or_default();
        let (changed_files, file_changes) = parse_numstat(&diff_numstat);

        Ok(GitSnapshot { branch, unmerged_commits, uncommitted_files, changed_files, file_changes })
    }
}

fn parse_numstat(output: &str) -> (Vec<String>, Vec<FileChange>) {
    let mut changed_files = Vec::new();
    let mut file_changes = Vec::new();
    for line in output.lines() {
        let mut parts = line.splitn(3, '\t');
        let (Some(added), Some(deleted), Some(path)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        changed_files.push(path.to_string());
        file_changes.push(FileChange {
            path: path.to_string(),
            additions: added.parse().unwrap_or(0),
            deletions: deleted.parse().unwrap_or(0),
        });
    }
    (changed_files, file_changes)
}

/// Runs `git <args>` in `worktree_path`, killing it if it runs past
/// `timeout`. Returns `Ok(None)` for a clean non-zero exit (e.g. no
/// upstream configured for the `log` query) rather than treating every
/// non-zero git exit as a hard failure.
fn run_git(worktree_path: &str, args: &[&str], timeout: Duration) -> Result<Option<String>, WorkContextError> {
    let mut child = Command::new("git")
        .arg("-C")
        .arg(worktree_path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| WorkContextError::Failed(e.to_string()))?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait().map_err(|e| WorkContextError::Failed(e.to_string()))? {
            Some(status) => {
                if !status.success() {
                    return Ok(None);
                }
                let mut stdout = child.stdout.take().expect("stdout was piped");
                let mut buf = String::new();
                stdout.read_to_string(&mut buf).map_err(|e| WorkContextError::Failed(e.to_string()))?;
                return Ok(Some(buf));
            }
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(WorkContextError::Timeout);
            }
            None => std::thread::sleep(Duration::from_millis(20)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_on_a_plain_git_repo_reports_current_branch() {
        let dir = tempfile::tempdir().unwrap();
        let run = |args: &[&str]| {
            assert!(Command::new("git").arg("-C").arg(dir.path()).args(args).status().unwrap().success());
        };
        run(&["init", "-q", "-b", "main"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "test"]);
        std::fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "initial"]);

        let extractor = GitCliWorkContextExtractor;
        let snapshot = extractor.extract(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(snapshot.branch.as_deref(), Some("main"));
        assert!(snapshot.uncommitted_files.is_empty());
    }

    #[test]
    fn extract_reports_uncommitted_files() {
        let dir = tempfile::tempdir().unwrap();
        let run = |args: &[&str]| {
            assert!(Command::new("git").arg("-C").arg(dir.path()).args(args).status().unwrap().success());
        };
        run(&["init", "-q", "-b", "main"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "test"]);
        std::fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "initial"]);
        std::fs::write(dir.path().join("b.txt"), "world\n").unwrap();

        let extractor = GitCliWorkContextExtractor;
        let snapshot = extractor.extract(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(snapshot.uncommitted_files, vec!["b.txt".to_string()]);
    }
}
