// SPDX-License-Identifier: MIT

//! Daemon startup and shutdown (spec.md §4.7, §5).
//!
//! Grounded in the teacher's `lifecycle::{startup, mod}`: acquire the
//! exclusive lock before touching anything else, validate everything that
//! can fail before binding a listener, and tear down in the reverse order on
//! shutdown. The crash-recovery sweep (closing every still-open session) and
//! `everyone`-group seeding happen here, between replay and "ready to
//! serve".

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use fs2::FileExt;
use thiserror::Error;
use thrum_core::AgentId;

use crate::config::Config;
use crate::dispatcher::Registry;
use crate::group_resolver;
use crate::state::StateLock;

/// The system identity used for daemon-originated events (seeding the
/// `everyone` group) that have no human or agent caller behind them.
pub const SYSTEM_AGENT: &str = "agent:system:daemon:000000000000";

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to acquire exclusive lock at {0}: daemon already running?")]
    LockFailed(PathBuf),

    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] thrum_storage::StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a running daemon needs, bundled for `main.rs` to hand to its
/// transports. Dropping this releases the exclusive lock (via `_lock_file`'s
/// `Drop`), but `shutdown` should be called first for an orderly teardown.
pub struct DaemonHandle {
    pub config: Config,
    pub state: StateLock,
    pub registry: Registry,
    pub start_time: Instant,
    lock_file: std::fs::File,
}

/// Opens (or creates) state, replays the event log, runs the startup crash
/// recovery sweep, and seeds the `everyone` group. Does not bind any
/// listener — `main.rs` does that only after this returns successfully, so
/// a daemon that fails to start never appears to be serving.
pub fn startup(config: Config) -> Result<DaemonHandle, LifecycleError> {
    std::fs::create_dir_all(&config.thrum_dir)?;

    // Acquire the lock before truncating it, so a failed acquisition never
    // wipes the running daemon's PID (mirrors the teacher's startup_inner).
    let lock_file = OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(|_| LifecycleError::LockFailed(config.lock_path.clone()))?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    std::fs::create_dir_all(&config.identities_dir)?;
    std::fs::create_dir_all(&config.context_dir)?;
    std::fs::create_dir_all(&config.archive_dir)?;
    std::fs::write(&config.schema_version_path, thrum_storage::SCHEMA_VERSION.to_string())?;

    let origin_daemon = format!("thrumd-{}", std::process::id());
    let state = StateLock::open(&config, origin_daemon)?;

    // Crash recovery sweep (spec.md §4.7): every session still open at
    // startup could not have survived whatever ended the previous process.
    let closed = state.write(|s| s.store.close_all_open_sessions(Utc::now()))?;
    if closed > 0 {
        tracing::info!(closed, "closed sessions left open by a previous run");
    }

    group_resolver::seed_everyone_group(&state, &AgentId::from_string(SYSTEM_AGENT))?;

    Ok(DaemonHandle { config, state, registry: Registry::new(), start_time: Instant::now(), lock_file })
}

/// Orderly shutdown: flush the event log, drop the socket file, and release
/// the lock (the lock file itself is removed last so a concurrent `startup`
/// sees a `LockFailed` rather than a window where neither lock nor socket
/// exists).
pub fn shutdown(handle: DaemonHandle) -> Result<(), LifecycleError> {
    handle.state.write(|s| s.event_log.flush())?;

    if handle.config.socket_path.exists() {
        if let Err(e) = std::fs::remove_file(&handle.config.socket_path) {
            tracing::warn!(error = %e, "failed to remove socket file on shutdown");
        }
    }

    drop(handle.lock_file);
    if let Err(e) = std::fs::remove_file(&handle.config.lock_path) {
        tracing::warn!(error = %e, "failed to remove lock file on shutdown");
    }

    Ok(())
}
