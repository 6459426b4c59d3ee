//! CLI-specific error types
//!
//! Engine-level outcomes (warn verdicts, per-item failures) are
//! carried in reports and exit codes; these errors are for runs
//! that could not produce a report at all.

use std::fmt;
use std::io;

use crate::backup::BackupError;
use crate::store::StoreError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (report files, terminal)
    IoError,
    /// The store rejected or never received a request
    StoreError,
    /// Backup file could not be produced or read
    BackupError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "CASEOPS_CONFIG_ERROR",
            Self::IoError => "CASEOPS_IO_ERROR",
            Self::StoreError => "CASEOPS_STORE_ERROR",
            Self::BackupError => "CASEOPS_BACKUP_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code_str(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::new(CliErrorCode::StoreError, e.to_string())
    }
}

impl From<BackupError> for CliError {
    fn from(e: BackupError) -> Self {
        Self::new(CliErrorCode::BackupError, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            CliError::config_error("bad").code_str(),
            "CASEOPS_CONFIG_ERROR"
        );
        assert_eq!(CliError::io_error("x").code_str(), "CASEOPS_IO_ERROR");
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let err = CliError::config_error("store_url is required");
        let rendered = err.to_string();
        assert!(rendered.contains("CASEOPS_CONFIG_ERROR"));
        assert!(rendered.contains("store_url is required"));
    }

    #[test]
    fn test_store_error_conversion() {
        let err: CliError = StoreError::connection("refused").into();
        assert_eq!(err.code(), &CliErrorCode::StoreError);
    }
}
