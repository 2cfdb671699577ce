//! Epoch Keeper
//!
//! The scheduled operator job. The engine never advances itself; the keeper
//! opens one epoch per interval and tops the vault up with yield drawn from
//! a treasury account.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;

use crate::common::config::{ConfigError, VaultConfig};
use crate::common::logging::log_system_event;
use crate::common::Result;
use crate::engine::math::bps_of;
use crate::engine::{EpochReport, EpochVaultEngine, YieldOutcome};
use crate::types::{format_units, Address, ExchangeRate};

/// Keeper configuration
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    /// Caller presented to the engine for privileged operations
    pub operator: Address,
    /// Account yield is drawn from
    pub treasury: Address,
    /// Yield per epoch relative to underlying held; 0 disables injection
    pub yield_bps_per_epoch: u16,
    pub interval: Duration,
    /// Stop after this many ticks; `None` runs until `stop`
    pub max_epochs: Option<u64>,
}

impl KeeperConfig {
    /// Keeper settings from the vault config, acting as the first operator
    pub fn from_vault_config(config: &VaultConfig) -> std::result::Result<Self, ConfigError> {
        let operator = config
            .operators
            .first()
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnvVar("LSTBTC_OPERATORS".to_string()))?;

        Ok(Self {
            operator,
            treasury: config.treasury.clone(),
            yield_bps_per_epoch: config.yield_bps_per_epoch,
            interval: Duration::from_secs(config.epoch_interval_secs),
            max_epochs: None,
        })
    }

    pub fn with_max_epochs(mut self, epochs: u64) -> Self {
        self.max_epochs = Some(epochs);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Result of a keeper tick
#[derive(Debug, Clone)]
pub struct KeeperTick {
    pub report: EpochReport,
    /// Underlying units injected this tick
    pub yield_injected: u64,
    pub new_rate: Option<ExchangeRate>,
    /// Why no yield was injected, when the step was attempted
    pub yield_error: Option<String>,
}

impl std::fmt::Display for KeeperTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, yield={}", self.report, format_units(self.yield_injected))?;
        if let Some(rate) = &self.new_rate {
            write!(f, ", rate={}", rate)?;
        }
        if let Some(err) = &self.yield_error {
            write!(f, ", yield_error={}", err)?;
        }
        Ok(())
    }
}

/// Periodic epoch advancement and yield injection
pub struct EpochKeeper {
    config: KeeperConfig,
    engine: Arc<EpochVaultEngine>,
    running: Arc<RwLock<bool>>,
}

impl EpochKeeper {
    pub fn new(config: KeeperConfig, engine: Arc<EpochVaultEngine>) -> Self {
        Self {
            config,
            engine,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Advance one epoch, then fund and inject the configured yield
    pub async fn tick(&self) -> Result<KeeperTick> {
        let report = self.engine.advance_epoch(&self.config.operator).await?;
        let mut tick = KeeperTick {
            report,
            yield_injected: 0,
            new_rate: None,
            yield_error: None,
        };

        if self.config.yield_bps_per_epoch == 0 {
            return Ok(tick);
        }

        let state = self.engine.state().await;
        if state.total_supply == 0 {
            return Ok(tick);
        }

        let amount = bps_of(state.total_underlying_held, self.config.yield_bps_per_epoch)?;
        if amount == 0 {
            return Ok(tick);
        }

        match self
            .engine
            .inject_funded_yield(&self.config.operator, &self.config.treasury, amount)
            .await
        {
            Ok(YieldOutcome::Applied { new_rate, .. }) => {
                tick.yield_injected = amount;
                tick.new_rate = Some(new_rate);
            }
            Ok(YieldOutcome::Skipped) => {
                tick.yield_error = Some("no supply to distribute to".to_string());
            }
            Err(e) => {
                tracing::warn!(target: "lstbtc::keeper", amount, error = %e, "Yield step failed, epoch still advanced");
                tick.yield_error = Some(e.to_string());
            }
        }

        Ok(tick)
    }

    /// Run the keeper loop
    pub async fn run(&self) -> Result<()> {
        *self.running.write().await = true;

        log_system_event(
            "keeper_started",
            serde_json::json!({
                "operator": self.config.operator.as_str(),
                "interval_secs": self.config.interval.as_secs_f64(),
                "yield_bps_per_epoch": self.config.yield_bps_per_epoch,
                "max_epochs": self.config.max_epochs,
            }),
        );

        let mut interval = tokio::time::interval(self.config.interval.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut completed: u64 = 0;

        loop {
            interval.tick().await;

            if !*self.running.read().await {
                break;
            }

            match self.tick().await {
                Ok(result) => {
                    tracing::info!(target: "lstbtc::keeper", "[tick] {}", result);
                }
                Err(e) => {
                    tracing::error!(target: "lstbtc::keeper", code = e.error_code(), retryable = e.is_retryable(), error = %e, "[tick] failed");
                }
            }

            completed += 1;
            if self.config.max_epochs.map_or(false, |max| completed >= max) {
                break;
            }
        }

        *self.running.write().await = false;
        log_system_event("keeper_stopped", serde_json::json!({ "ticks": completed }));
        Ok(())
    }

    /// Stop the keeper loop after the current tick
    pub async fn stop(&self) {
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
