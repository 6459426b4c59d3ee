//! Backup error types

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::store::StoreError;

/// Result type for backup operations
pub type BackupResult<T> = Result<T, BackupError>;

/// Errors raised while exporting or reading backup files
#[derive(Debug, Error)]
pub enum BackupError {
    /// Filesystem failure at a known path
    #[error("backup I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Payload (de)serialization failure
    #[error("backup serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store fetch behind an export failed
    #[error("store error during backup: {0}")]
    Store(#[from] StoreError),

    /// The file is not a backup document
    #[error("malformed backup file: {0}")]
    Malformed(String),
}

impl BackupError {
    /// I/O error tagged with the path it happened at
    pub fn io_at(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Malformed-file error with a message
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
