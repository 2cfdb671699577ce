//! Structured Logging for the lstBTC Engine
//!
//! Provides structured logging with:
//! - JSON output for log aggregation services
//! - Correlation IDs for tracing one operation through the log
//! - Security event logging for operator checks
//!
//! # Usage
//!
//! ```rust,ignore
//! use lstbtc::logging::{init_logging, LogLevel};
//!
//! // Initialize at startup
//! init_logging(LogLevel::Info, true)?; // JSON mode for production
//!
//! // Log events
//! tracing::info!(target: "lstbtc::epoch", epoch = 4, "Epoch advanced");
//! ```

use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

// ============================================================================
// Log Levels
// ============================================================================

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

// ============================================================================
// Structured Event Types
// ============================================================================

/// Event categories for structured logging
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Deposit,
    /// Queued, settled and emergency redemptions
    Redemption,
    /// Epoch boundaries
    Epoch,
    /// Yield injections and rate rebases
    Yield,
    /// Operator checks
    Security,
    /// Startup, shutdown, keeper loop
    System,
}

/// Structured log event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// Event timestamp (ISO 8601)
    pub timestamp: String,
    pub level: String,
    pub category: EventCategory,
    pub message: String,
    /// Correlation ID (usually the transaction record ID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

/// Error details for error events
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEvent {
    pub fn new(level: LogLevel, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: level.as_filter().to_uppercase(),
            category,
            message: message.into(),
            correlation_id: None,
            data: None,
            error: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(ErrorDetails {
            code: code.into(),
            message: message.into(),
        });
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"failed to serialize log\", \"message\": \"{}\"}}",
                self.message
            )
        })
    }

    fn emit(&self, target_level: LogLevel) {
        let json = self.to_json();
        match (self.category, target_level) {
            (_, LogLevel::Error) => tracing::error!(target: "lstbtc::events", "{}", json),
            (_, LogLevel::Warn) => tracing::warn!(target: "lstbtc::events", "{}", json),
            (_, LogLevel::Debug | LogLevel::Trace) => {
                tracing::debug!(target: "lstbtc::events", "{}", json)
            }
            _ => tracing::info!(target: "lstbtc::events", "{}", json),
        }
    }
}

// ============================================================================
// Domain Event Logging
// ============================================================================

/// Log a security-related event
pub fn log_security_event(
    event_type: &str,
    success: bool,
    details: serde_json::Value,
    correlation_id: Option<&str>,
) {
    let level = if success { LogLevel::Info } else { LogLevel::Warn };
    let mut event = LogEvent::new(level, EventCategory::Security, event_type).with_data(
        serde_json::json!({
            "success": success,
            "details": details
        }),
    );

    if let Some(id) = correlation_id {
        event = event.with_correlation_id(id);
    }

    event.emit(level);
}

/// Log a deposit event
pub fn log_deposit_event(
    event_type: &str,
    tx_id: &str,
    user: &str,
    liquid_amount: u64,
    underlying_amount: u64,
    error: Option<&str>,
) {
    let level = if error.is_none() { LogLevel::Info } else { LogLevel::Warn };
    let mut event = LogEvent::new(level, EventCategory::Deposit, event_type)
        .with_correlation_id(tx_id)
        .with_data(serde_json::json!({
            "user": user,
            "liquid_amount": liquid_amount,
            "underlying_amount": underlying_amount,
        }));

    if let Some(err) = error {
        event = event.with_error("DEPOSIT_ERROR", err);
    }

    event.emit(level);
}

/// Log a redemption event (request, settlement, deferral, emergency)
pub fn log_redemption_event(
    event_type: &str,
    tx_id: &str,
    user: &str,
    liquid_amount: u64,
    payout: u64,
    epoch: u64,
    error: Option<&str>,
) {
    let level = if error.is_none() { LogLevel::Info } else { LogLevel::Warn };
    let mut event = LogEvent::new(level, EventCategory::Redemption, event_type)
        .with_correlation_id(tx_id)
        .with_data(serde_json::json!({
            "user": user,
            "liquid_amount": liquid_amount,
            "payout": payout,
            "epoch": epoch,
        }));

    if let Some(err) = error {
        event = event.with_error("REDEMPTION_ERROR", err);
    }

    event.emit(level);
}

/// Log an epoch boundary summary
pub fn log_epoch_event(epoch: u64, settled: usize, deferred: usize, paid_out: u64) {
    let level = if deferred == 0 { LogLevel::Info } else { LogLevel::Warn };
    LogEvent::new(level, EventCategory::Epoch, "epoch_advanced")
        .with_data(serde_json::json!({
            "epoch": epoch,
            "settled": settled,
            "deferred": deferred,
            "paid_out": paid_out,
        }))
        .emit(level);
}

/// Log a yield injection attempt
pub fn log_yield_event(
    event_type: &str,
    amount: u64,
    previous_rate: &str,
    new_rate: &str,
    error: Option<&str>,
) {
    let level = if error.is_none() { LogLevel::Info } else { LogLevel::Error };
    let mut event = LogEvent::new(level, EventCategory::Yield, event_type).with_data(
        serde_json::json!({
            "amount": amount,
            "previous_rate": previous_rate,
            "new_rate": new_rate,
        }),
    );

    if let Some(err) = error {
        event = event.with_error("YIELD_ERROR", err);
    }

    event.emit(level);
}

/// Log a lifecycle event (keeper start/stop, startup)
pub fn log_system_event(event_type: &str, data: serde_json::Value) {
    LogEvent::new(LogLevel::Info, EventCategory::System, event_type)
        .with_data(data)
        .emit(LogLevel::Info);
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the logging system
///
/// `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lstbtc={}", level.as_filter())));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Initialize logging from VaultConfig (JSON on mainnet)
pub fn init_from_config(config: &super::config::VaultConfig) -> Result<(), LoggingError> {
    let level = LogLevel::from(config.log_level.as_str());
    let json_format = config.network == super::config::Network::Mainnet;

    init_logging(level, json_format)
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

/// Generate a unique correlation ID
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
