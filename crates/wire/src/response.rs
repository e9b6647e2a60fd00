// SPDX-License-Identifier: MIT

//! JSON-RPC 2.0 response envelope (spec.md §4.8).

use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// JSON-RPC request/response identifiers may be a number, a string, or null.
/// Notifications (server push, no reply expected) are modeled separately in
/// `notify.rs` rather than as requests with a null id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    String(String),
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: crate::request::JsonRpcVersion,
    pub id: RpcId,
    #[serde(flatten)]
    pub outcome: RpcOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RpcOutcome {
    Result { result: serde_json::Value },
    Error { error: RpcError },
}

impl RpcResponse {
    pub fn success(id: RpcId, result: serde_json::Value) -> Self {
        Self { jsonrpc: crate::request::JsonRpcVersion, id, outcome: RpcOutcome::Result { result } }
    }

    pub fn failure(id: RpcId, error: RpcError) -> Self {
        Self { jsonrpc: crate::request::JsonRpcVersion, id, outcome: RpcOutcome::Error { error } }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, RpcOutcome::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcErrorCode;

    #[test]
    fn success_round_trips() {
        let resp = RpcResponse::success(RpcId::Number(7), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("error"));
        let back: RpcResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(resp, back);
        assert!(!back.is_error());
    }

    #[test]
    fn failure_round_trips() {
        let resp = RpcResponse::failure(RpcId::String("abc".into()), RpcError::method_not_found("bogus"));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("\"result\""));
        let back: RpcResponse = serde_json::from_str(&json).unwrap();
        assert!(back.is_error());
        if let RpcOutcome::Error { error } = back.outcome {
            assert_eq!(error.code, RpcErrorCode::MethodNotFound.code());
        } else {
            panic!("expected error outcome");
        }
    }
}
