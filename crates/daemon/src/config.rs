// SPDX-License-Identifier: MIT

//! Daemon configuration: paths under a repo's `.thrum/` directory plus the
//! identity defaults environment variables provide (spec.md §6).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Daemon configuration, rooted at a single repo checkout. Unlike the
/// teacher's single user-level daemon serving every project
/// (`~/.local/state/oj/`), thrum is repo-scoped: one daemon, one `.thrum/`
/// directory, one socket.
#[derive(Debug, Clone)]
pub struct Config {
    pub repo_root: PathBuf,
    pub thrum_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub ws_addr: SocketAddr,
    pub event_log_path: PathBuf,
    pub db_path: PathBuf,
    pub schema_version_path: PathBuf,
    pub identities_dir: PathBuf,
    pub context_dir: PathBuf,
    pub archive_dir: PathBuf,
    /// How long a session may go without a heartbeat before the next startup
    /// sweep treats it as crashed (spec.md §4.7). Sessions are always closed
    /// unconditionally on startup regardless of this value; it exists for a
    /// future live reaper, kept here so its home doesn't need to move later.
    pub crash_recovery_idle: std::time::Duration,
    pub identity: IdentityDefaults,
    /// Gates the legacy-broadcast inbox arm (spec.md §9 open question).
    pub legacy_broadcast_enabled: bool,
    /// Shared secret `sync.*` callers must present (spec.md §4.8); `None`
    /// disables the peer surface entirely, since an absent secret can never
    /// be "presented".
    pub peer_token: Option<String>,
}

/// Identity defaults sourced from the environment (spec.md §6): used when an
/// RPC caller doesn't pass an explicit role/module/display/hostname.
#[derive(Debug, Clone, Default)]
pub struct IdentityDefaults {
    pub role: Option<String>,
    pub module: Option<String>,
    pub display: Option<String>,
    pub hostname: Option<String>,
}

impl IdentityDefaults {
    pub fn from_env() -> Self {
        Self {
            role: std::env::var("THRUM_ROLE").ok(),
            module: std::env::var("THRUM_MODULE").ok(),
            display: std::env::var("THRUM_DISPLAY").ok(),
            hostname: std::env::var("THRUM_HOSTNAME").ok(),
        }
    }
}

/// On-disk overrides, `.thrum/config.toml` (optional). Any field not present
/// falls back to the built-in default.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    ws_port: Option<u16>,
    legacy_broadcast_enabled: Option<bool>,
    crash_recovery_idle_secs: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine repo root: {0}")]
    RepoRoot(std::io::Error),
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

impl Config {
    /// Loads configuration for the repo containing `repo_root` (or the
    /// current directory, if `None`), reading `.thrum/config.toml` if
    /// present and falling back to built-in defaults otherwise.
    pub fn load(repo_root: Option<PathBuf>) -> Result<Self, ConfigError> {
        let repo_root = match repo_root {
            Some(p) => p,
            None => std::env::current_dir().map_err(ConfigError::RepoRoot)?,
        };
        let thrum_dir = repo_root.join(".thrum");

        let file_config = Self::read_file_config(&thrum_dir)?;

        let ws_port = file_config.ws_port.unwrap_or(47_700);
        let legacy_broadcast_enabled = file_config.legacy_broadcast_enabled.unwrap_or(false);
        let crash_recovery_idle = std::time::Duration::from_secs(file_config.crash_recovery_idle_secs.unwrap_or(300));

        Ok(Self {
            socket_path: thrum_dir.join("daemon.sock"),
            lock_path: thrum_dir.join("daemon.lock"),
            ws_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), ws_port),
            event_log_path: thrum_dir.join("sync").join("events.jsonl"),
            db_path: thrum_dir.join("var").join("messages.db"),
            schema_version_path: thrum_dir.join("schema_version"),
            identities_dir: thrum_dir.join("identities"),
            context_dir: thrum_dir.join("context"),
            archive_dir: thrum_dir.join("archive"),
            crash_recovery_idle,
            identity: IdentityDefaults::from_env(),
            legacy_broadcast_enabled,
            peer_token: std::env::var("THRUM_PEER_TOKEN").ok(),
            thrum_dir,
            repo_root,
        })
    }

    fn read_file_config(thrum_dir: &Path) -> Result<FileConfig, ConfigError> {
        let path = thrum_dir.join("config.toml");
        if !path.exists() {
            return Ok(FileConfig::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path, e))
    }
}
