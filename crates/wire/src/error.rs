// SPDX-License-Identifier: MIT

//! JSON-RPC error codes (spec.md §4.9).

use serde::{Deserialize, Serialize};
use thrum_core::ThrumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ApplicationError,
    TransportRestricted,
}

impl RpcErrorCode {
    pub const fn code(self) -> i64 {
        match self {
            RpcErrorCode::ParseError => -32700,
            RpcErrorCode::InvalidRequest => -32600,
            RpcErrorCode::MethodNotFound => -32601,
            RpcErrorCode::InvalidParams => -32602,
            RpcErrorCode::InternalError => -32603,
            RpcErrorCode::ApplicationError => -32000,
            RpcErrorCode::TransportRestricted => -32001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self { code: code.code(), message: message.into(), data: None }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(RpcErrorCode::MethodNotFound, format!("method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::InvalidParams, message.into())
    }

    pub fn transport_restricted(method: &str) -> Self {
        Self::new(
            RpcErrorCode::TransportRestricted,
            format!("{method} is restricted to WebSocket connections"),
        )
    }
}

/// Map a domain error kind (spec.md §7) onto its JSON-RPC error code.
/// `Internal` is the only kind that maps to `-32603`; everything else is an
/// application error surfaced with its human-readable message intact.
impl From<ThrumError> for RpcError {
    fn from(err: ThrumError) -> Self {
        let code = if err.is_application_error() { RpcErrorCode::ApplicationError } else { RpcErrorCode::InternalError };
        Self::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_map_to_dash_32603() {
        let rpc: RpcError = ThrumError::Internal("db gone".into()).into();
        assert_eq!(rpc.code, -32603);
    }

    #[test]
    fn application_errors_map_to_dash_32000() {
        for err in [
            ThrumError::Validation("x".into()),
            ThrumError::NotFound("x".into()),
            ThrumError::Conflict("x".into()),
            ThrumError::UnknownRecipients("x".into()),
            ThrumError::StateIllegal("x".into()),
            ThrumError::Authorization("x".into()),
        ] {
            let rpc: RpcError = err.into();
            assert_eq!(rpc.code, -32000);
        }
    }
}
