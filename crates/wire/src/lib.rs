// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! thrum-wire: JSON-RPC 2.0 request/response framing for the thrum daemon.
//!
//! Wire format: newline-delimited JSON-RPC 2.0 (spec.md §4.8/§6) — one
//! request or response object per line, UTF-8, LF-terminated. This replaces
//! the teacher's 4-byte length-prefix framing (`oj-wire`'s `wire::encode`/
//! `decode`), which the spec's transport section explicitly redesigns away
//! from; see SPEC_FULL.md §4.8 and DESIGN.md.

pub mod codec;
pub mod error;
pub mod notify;
pub mod request;
pub mod response;

pub use codec::{read_line_message, write_line_message, ProtocolError};
pub use error::{RpcError, RpcErrorCode};
pub use notify::{Notification, ThreadNotification};
pub use request::RpcRequest;
pub use response::{RpcId, RpcResponse};
