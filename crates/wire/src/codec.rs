// SPDX-License-Identifier: MIT

//! Newline-delimited framing for JSON-RPC messages (spec.md §4.8).
//!
//! Each message is one JSON object followed by a single `\n`. This replaces
//! the teacher's 4-byte big-endian length prefix (`oj-daemon`'s
//! `protocol::wire::{read_message, write_message}`) with line framing, per
//! the transport redesign in SPEC_FULL.md §4.8.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    Closed,
    #[error("timed out waiting for message")]
    Timeout,
    #[error("message exceeded max line length ({0} bytes)")]
    TooLarge(usize),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lines longer than this are rejected rather than buffered indefinitely.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Reads one newline-delimited JSON message from `reader`, waiting at most
/// `timeout` for the read to complete. Returns [`ProtocolError::Closed`] on
/// EOF (0 bytes read), matching the teacher's "EOF means client disconnected"
/// convention in `listener::handle_connection`.
pub async fn read_line_message<R, T>(
    reader: &mut BufReader<R>,
    timeout: Duration,
) -> Result<T, ProtocolError>
where
    R: tokio::io::AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let read = tokio::time::timeout(timeout, reader.read_line(&mut line))
        .await
        .map_err(|_| ProtocolError::Timeout)??;

    if read == 0 {
        return Err(ProtocolError::Closed);
    }
    if line.len() > MAX_LINE_BYTES {
        return Err(ProtocolError::TooLarge(line.len()));
    }

    Ok(serde_json::from_str(line.trim_end_matches(['\n', '\r']))?)
}

/// Writes `value` as one line of JSON followed by `\n`, waiting at most
/// `timeout` for the write (and flush) to complete.
pub async fn write_line_message<W, T>(
    writer: &mut W,
    value: &T,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: tokio::io::AsyncWrite + Unpin,
    T: Serialize,
{
    let mut payload = serde_json::to_vec(value)?;
    payload.push(b'\n');

    tokio::time::timeout(timeout, async {
        writer.write_all(&payload).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| ProtocolError::Timeout)??;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_request() {
        let mut buffer: Vec<u8> = Vec::new();
        write_line_message(&mut buffer, &serde_json::json!({"hello": "world"}), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(buffer.last(), Some(&b'\n'));

        let mut reader = BufReader::new(std::io::Cursor::new(buffer));
        let value: serde_json::Value = read_line_message(&mut reader, Duration::from_secs(1)).await.unwrap();
        assert_eq!(value, serde_json::json!({"hello": "world"}));
    }

    #[tokio::test]
    async fn empty_stream_is_closed() {
        let mut reader = BufReader::new(std::io::Cursor::new(Vec::<u8>::new()));
        let result: Result<serde_json::Value, _> = read_line_message(&mut reader, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ProtocolError::Closed)));
    }

    #[tokio::test]
    async fn oversized_line_is_rejected() {
        let mut huge = "a".repeat(MAX_LINE_BYTES + 1).into_bytes();
        huge.push(b'\n');
        let mut reader = BufReader::new(std::io::Cursor::new(huge));
        let result: Result<serde_json::Value, _> = read_line_message(&mut reader, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ProtocolError::TooLarge(_))));
    }
}
