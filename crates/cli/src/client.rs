// SPDX-License-Identifier: MIT

//! A thin JSON-RPC client over the daemon's local stream socket.
//!
//! Grounded in the teacher's `DaemonClient` (connect, send, await one
//! response) but simplified: thrum's CLI is a diagnostic/scripting client,
//! not the primary way agents talk to the daemon (agent processes dial the
//! socket directly and keep the connection open for pushes), so there's no
//! need for a `connect_or_start` auto-spawn path or a persistent connection.
//! One request, one reply, one round trip.

use std::time::Duration;

use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::UnixStream;
use thrum_wire::codec::{read_line_message, write_line_message, ProtocolError};
use thrum_wire::request::RpcRequest;
use thrum_wire::response::{RpcId, RpcOutcome, RpcResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running at {0}")]
    NotRunning(std::path::PathBuf),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("daemon error ({code}): {message}")]
    Application { code: i64, message: String },
}

pub struct DaemonClient {
    stream: UnixStream,
    next_id: i64,
}

impl DaemonClient {
    pub async fn connect(socket_path: &std::path::Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path).await.map_err(|_| ClientError::NotRunning(socket_path.to_path_buf()))?;
        Ok(Self { stream, next_id: 1 })
    }

    /// Sends one request and waits for its matching response. thrum's
    /// connections are a persistent read loop server-side (spec.md §4.8),
    /// but a CLI invocation only ever issues one request before exiting, so
    /// a push notification arriving first would be indistinguishable from
    /// the reply — this client never subscribes, so that race can't happen.
    pub async fn call(&mut self, method: &str, params: Option<serde_json::Value>) -> Result<serde_json::Value, ClientError> {
        let id = RpcId::Number(self.next_id);
        self.next_id += 1;
        let request = RpcRequest::new(id, method, params);

        write_line_message(&mut self.stream, &request, REQUEST_TIMEOUT).await?;

        let mut reader = BufReader::new(&mut self.stream);
        let response: RpcResponse = read_line_message(&mut reader, REQUEST_TIMEOUT).await?;

        match response.outcome {
            RpcOutcome::Result { result } => Ok(result),
            RpcOutcome::Error { error } => Err(ClientError::Application { code: error.code, message: error.message }),
        }
    }
}
