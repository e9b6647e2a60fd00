// SPDX-License-Identifier: MIT

//! thrumd: the repo-scoped multi-agent coordination daemon.
//!
//! Grounded in the teacher's startup shape (acquire the lock, replay state,
//! bind listeners, run until signalled, tear down in reverse order) but with
//! a single repo-scoped configuration instead of the teacher's user-level
//! state directory serving many projects at once.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thrum_daemon::handlers::{HandlerContext, TransportKind};
use thrum_daemon::{config::Config, lifecycle, transport};

#[derive(Parser, Debug)]
#[command(name = "thrumd", version, about = "Repo-scoped multi-agent coordination daemon")]
struct Cli {
    /// Repo root to serve; defaults to the current directory.
    #[arg(long, env = "THRUM_REPO_ROOT")]
    repo_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "thrumd exited with an error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error("config error: {0}")]
    Config(#[from] thrum_daemon::config::ConfigError),
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] lifecycle::LifecycleError),
    #[error("transport error: {0}")]
    Transport(#[from] transport::TransportError),
}

async fn run(cli: Cli) -> Result<(), MainError> {
    let config = Config::load(cli.repo_root)?;
    let socket_path = config.socket_path.clone();
    let ws_addr = config.ws_addr;

    let handle = lifecycle::startup(config)?;
    tracing::info!(socket = %socket_path.display(), ws_addr = %ws_addr, "thrumd starting");

    let ctx = HandlerContext {
        state: handle.state.clone(),
        registry: handle.registry.clone(),
        config: std::sync::Arc::new(handle.config.clone()),
        start_time: handle.start_time,
        transport: TransportKind::Unix,
    };

    let listener = transport::Listener::bind(&socket_path, ws_addr, ctx).await?;

    tokio::select! {
        () = listener.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    lifecycle::shutdown(handle)?;
    Ok(())
}
