// SPDX-License-Identifier: MIT

//! `thrum`: a scripting/diagnostic client for a running `thrumd`.
//!
//! Grounded in the teacher's `oj` CLI (clap subcommands, one module per
//! command family, a thin client that talks JSON to the daemon), trimmed to
//! what the spec treats as in scope: CLI argument parsing is explicitly an
//! external collaborator (spec.md §1 "Out of scope"), so this binary is a
//! straightforward request/response shell around the RPC surface rather than
//! the teacher's table-and-color-rendered UX.

mod client;
mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "thrum", version, about = "Client for the repo-scoped multi-agent coordination daemon")]
struct Cli {
    /// Repo root whose `.thrum/daemon.sock` to dial; defaults to the current directory.
    #[arg(long, global = true, env = "THRUM_REPO_ROOT")]
    repo_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Agent registration and roster queries.
    #[command(subcommand)]
    Agent(commands::agent::AgentCommand),
    /// Session lifecycle.
    #[command(subcommand)]
    Session(commands::session::SessionCommand),
    /// Sending and reading messages.
    #[command(subcommand)]
    Message(commands::message::MessageCommand),
    /// Threads.
    #[command(subcommand)]
    Thread(commands::thread::ThreadCommand),
    /// Groups and group membership.
    #[command(subcommand)]
    Group(commands::group::GroupCommand),
    /// Push-notification subscriptions.
    #[command(subcommand)]
    Subscription(commands::subscription::SubscriptionCommand),
    /// Per-agent context/preamble files.
    #[command(subcommand)]
    Context(commands::context::ContextCommand),
    /// Human-user identity (WebSocket-only server side; this client still
    /// dials the Unix socket, so `user register` always fails with
    /// "restricted to WebSocket connections" — kept for completeness and to
    /// exercise the transport-restriction error path from the shell).
    #[command(subcommand)]
    User(commands::user::UserCommand),
    /// Roster grouped by module.
    Team,
    /// Liveness probe.
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let socket_path = match resolve_socket_path(cli.repo_root) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut client = match client::DaemonClient::connect(&socket_path).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Agent(cmd) => commands::agent::run(&mut client, cmd).await,
        Command::Session(cmd) => commands::session::run(&mut client, cmd).await,
        Command::Message(cmd) => commands::message::run(&mut client, cmd).await,
        Command::Thread(cmd) => commands::thread::run(&mut client, cmd).await,
        Command::Group(cmd) => commands::group::run(&mut client, cmd).await,
        Command::Subscription(cmd) => commands::subscription::run(&mut client, cmd).await,
        Command::Context(cmd) => commands::context::run(&mut client, cmd).await,
        Command::User(cmd) => commands::user::run(&mut client, cmd).await,
        Command::Team => client.call("team.list", None).await.map_err(Into::into),
        Command::Health => client.call("health", None).await.map_err(Into::into),
    };

    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Resolves `.thrum/daemon.sock` the same way `thrumd` resolves its own
/// config (`thrum_daemon::config::Config`), so the CLI and the daemon agree
/// on where the socket lives without duplicating the path logic.
fn resolve_socket_path(repo_root: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let config = thrum_daemon::config::Config::load(repo_root)?;
    Ok(config.socket_path)
}
