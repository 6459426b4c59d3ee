//! Store error types
//!
//! The taxonomy the engines program against:
//! - `Connection`: store unreachable; fatal to the current fetch,
//!   tolerated by the monitor loop.
//! - `Schema`: missing table/column; dependent checks degrade to a
//!   warning and continue.
//! - `Validation`: malformed record; counted per record, never
//!   aborts a batch.
//! - `Api`: any other non-success response from the backend.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by a record-store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store unreachable (network failure, timeout)
    #[error("store unreachable: {0}")]
    Connection(String),

    /// Table or column absent
    #[error("schema error: {0}")]
    Schema(String),

    /// Non-success response that is neither connectivity nor schema
    #[error("store API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Malformed record payload
    #[error("record validation error: {0}")]
    Validation(String),

    /// JSON (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Connection error with a message
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Schema error with a message
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Validation error with a message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for store-unreachable failures
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// True for missing-table/column failures
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            return Self::Connection(e.to_string());
        }
        match e.status() {
            Some(status) => Self::Api {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => Self::Connection(e.to_string()),
        }
    }
}
