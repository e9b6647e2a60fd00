// SPDX-License-Identifier: MIT

//! Storage-layer error type, convertible into `thrum_core::ThrumError` at the
//! handler boundary.

use thiserror::Error;
use thrum_core::ThrumError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event log entry at sequence {0} is corrupt: {1}")]
    CorruptEntry(i64, String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("illegal state: {0}")]
    StateIllegal(String),
    #[error("not authorized: {0}")]
    Authorization(String),
}

impl From<StorageError> for ThrumError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(m) => ThrumError::NotFound(m),
            StorageError::Conflict(m) => ThrumError::Conflict(m),
            StorageError::Validation(m) => ThrumError::Validation(m),
            StorageError::StateIllegal(m) => ThrumError::StateIllegal(m),
            StorageError::Authorization(m) => ThrumError::Authorization(m),
            other => ThrumError::Internal(other.to_string()),
        }
    }
}
