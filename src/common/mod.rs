//! Common utilities shared across modules
//!
//! This module contains:
//! - Environment-based configuration
//! - Root error type
//! - Structured logging

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{ConfigError, Network, VaultConfig};
pub use error::{AppError, Result};
pub use logging::{init_from_config, init_logging, LogLevel, LoggingError};
