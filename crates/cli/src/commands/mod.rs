// SPDX-License-Identifier: MIT

//! One module per RPC method family, mirroring `thrum-daemon`'s
//! `handlers/` layout (spec.md §6) so a reader can match a CLI subcommand
//! to the handler it calls by name alone.

pub mod agent;
pub mod context;
pub mod group;
pub mod message;
pub mod session;
pub mod subscription;
pub mod thread;
pub mod user;
