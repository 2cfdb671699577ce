//! Common Error Types
//!
//! Unifies the per-module errors for the binary and the keeper.

use thiserror::Error;

use crate::engine::VaultError;
use crate::ledger::TransferError;
use crate::storage::StorageError;

/// Root error type for the lstBTC service
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Logging errors
    #[error("logging error: {0}")]
    Logging(#[from] super::logging::LoggingError),

    /// Engine rejections and invariant failures
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// Ledger errors outside the engine (simulated treasury top-ups)
    #[error("ledger error: {0}")]
    Ledger(#[from] TransferError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal errors
    #[error("internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Vault(e) => matches!(e, VaultError::TransferFailure(_)),
            AppError::Ledger(e) => matches!(e, TransferError::Unavailable(_)),
            AppError::Storage(StorageError::Connection(_)) => true,
            AppError::Io(_) => true,
            _ => false,
        }
    }

    /// Get error code for operator-facing output
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Logging(_) => "LOGGING_ERROR",
            AppError::Vault(e) => e.error_code(),
            AppError::Ledger(_) => "LEDGER_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Io(_) => "IO_ERROR",
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
