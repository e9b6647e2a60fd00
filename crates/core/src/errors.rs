// SPDX-License-Identifier: MIT

//! Error kinds shared across the daemon (spec.md §7).
//!
//! These are kinds, not wire types: the JSON-RPC error code a kind maps to
//! is decided at the transport boundary (`thrum-wire`), not here.

use thiserror::Error;

/// A domain error raised by routing, the projector, or a handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ThrumError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unknown recipients: {0}")]
    UnknownRecipients(String),

    #[error("illegal state: {0}")]
    StateIllegal(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("external: {0}")]
    External(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl ThrumError {
    /// True for every kind except `Internal` (spec.md §7: those are returned
    /// to the caller as JSON-RPC application errors; `Internal` aborts the
    /// transaction and maps to `-32603` instead).
    pub fn is_application_error(&self) -> bool {
        !matches!(self, ThrumError::Internal(_))
    }
}
