//! Environment-based Configuration for the lstBTC Engine
//!
//! # Environment Variables
//!
//! ## Network
//! - `LSTBTC_NETWORK` - "mainnet", "testnet", or "devnet" (default: "devnet")
//!
//! ## Accounts (required outside devnet)
//! - `LSTBTC_VAULT_ADDRESS` - Ledger account holding the vault's underlying
//! - `LSTBTC_FEE_RECEIVER` - Receives emergency redemption fees
//! - `LSTBTC_OPERATORS` - Comma-separated operator addresses
//! - `LSTBTC_TREASURY` - Account the keeper draws yield from
//!
//! ## Vault Parameters
//! - `LSTBTC_EMERGENCY_FEE_BPS` - Default emergency fee (default: 100)
//! - `LSTBTC_ACCEPTED_ASSETS` - e.g. "wbtc,stcore:0.5" (default: "wbtc")
//! - `LSTBTC_EPOCH_INTERVAL_SECS` - Epoch length (default: 86400)
//! - `LSTBTC_YIELD_BPS_PER_EPOCH` - Keeper yield per epoch (default: 0)
//!
//! ## Optional Settings
//! - `LSTBTC_JOURNAL_PATH` - SQLite journal file; in-memory when unset
//! - `LSTBTC_LOG_LEVEL` - Logging level (debug, info, warn, error)
//! - `LSTBTC_DEMO_MODE` - Set to "1" to allow the demo command (not on mainnet)

use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::StaticOperators;
use crate::types::{format_units, Address, AssetPrice, EngineConfig, BPS_DENOMINATOR};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("network mismatch: expected {0}, got {1}")]
    NetworkMismatch(String, String),

    #[error("demo mode not allowed on {0}")]
    DemoModeNotAllowed(String),

    #[error("demo mode disabled: set LSTBTC_DEMO_MODE=1")]
    DemoModeDisabled,
}

/// Network environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "devnet" | "dev" => Ok(Network::Devnet),
            _ => Err(ConfigError::InvalidValue(
                "LSTBTC_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

impl Network {
    /// Check if demo mode is allowed on this network
    pub fn allows_demo_mode(&self) -> bool {
        matches!(self, Network::Devnet | Network::Testnet)
    }
}

const DEVNET_VAULT: &str = "0x1111111111111111111111111111111111111111";
const DEVNET_FEE_RECEIVER: &str = "0x2222222222222222222222222222222222222222";
const DEVNET_TREASURY: &str = "0x3333333333333333333333333333333333333333";
const DEVNET_OPERATOR: &str = "0x4444444444444444444444444444444444444444";

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub network: Network,

    /// Ledger account holding the vault's underlying
    pub vault_address: Address,

    pub fee_receiver: Address,

    /// Callers allowed to advance epochs and inject yield
    pub operators: Vec<Address>,

    /// Source of keeper yield
    pub treasury: Address,

    pub emergency_fee_bps: u16,

    /// Deposit whitelist with prices in underlying units
    pub accepted_assets: Vec<AssetPrice>,

    pub epoch_interval_secs: u64,

    /// Yield the keeper injects per epoch, relative to underlying held
    pub yield_bps_per_epoch: u16,

    /// SQLite journal location; `None` keeps the journal in memory
    pub journal_path: Option<String>,

    pub demo_mode: bool,

    pub log_level: String,
}

impl VaultConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network: Network = lookup("LSTBTC_NETWORK")
            .unwrap_or_else(|| "devnet".to_string())
            .parse()?;

        let vault_address =
            required_address(&lookup, "LSTBTC_VAULT_ADDRESS", DEVNET_VAULT, network)?;
        let fee_receiver =
            required_address(&lookup, "LSTBTC_FEE_RECEIVER", DEVNET_FEE_RECEIVER, network)?;
        let treasury = required_address(&lookup, "LSTBTC_TREASURY", DEVNET_TREASURY, network)?;

        let operators = required_or_devnet_default(&lookup, "LSTBTC_OPERATORS", DEVNET_OPERATOR, network)?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| parse_address("LSTBTC_OPERATORS", s))
            .collect::<Result<Vec<_>, _>>()?;

        let emergency_fee_bps: u16 = parse_or(&lookup, "LSTBTC_EMERGENCY_FEE_BPS", 100)?;
        if emergency_fee_bps as u64 > BPS_DENOMINATOR {
            return Err(ConfigError::InvalidValue(
                "LSTBTC_EMERGENCY_FEE_BPS".to_string(),
                format!("{} exceeds {}", emergency_fee_bps, BPS_DENOMINATOR),
            ));
        }

        let accepted_assets = lookup("LSTBTC_ACCEPTED_ASSETS")
            .unwrap_or_else(|| "wbtc".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<AssetPrice>().map_err(|e| {
                    ConfigError::InvalidValue("LSTBTC_ACCEPTED_ASSETS".to_string(), e.to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if accepted_assets.is_empty() {
            return Err(ConfigError::InvalidValue(
                "LSTBTC_ACCEPTED_ASSETS".to_string(),
                "at least one asset required".to_string(),
            ));
        }

        let epoch_interval_secs: u64 = parse_or(&lookup, "LSTBTC_EPOCH_INTERVAL_SECS", 86_400)?;
        if epoch_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "LSTBTC_EPOCH_INTERVAL_SECS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let yield_bps_per_epoch: u16 = parse_or(&lookup, "LSTBTC_YIELD_BPS_PER_EPOCH", 0)?;
        if yield_bps_per_epoch as u64 > BPS_DENOMINATOR {
            return Err(ConfigError::InvalidValue(
                "LSTBTC_YIELD_BPS_PER_EPOCH".to_string(),
                format!("{} exceeds {}", yield_bps_per_epoch, BPS_DENOMINATOR),
            ));
        }

        let journal_path = lookup("LSTBTC_JOURNAL_PATH").filter(|p| !p.is_empty());

        // Demo mode (only allowed on testnet/devnet)
        let demo_mode = lookup("LSTBTC_DEMO_MODE").map(|v| v == "1").unwrap_or(false);
        if demo_mode && !network.allows_demo_mode() {
            return Err(ConfigError::DemoModeNotAllowed(format!("{:?}", network)));
        }

        let log_level = lookup("LSTBTC_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            network,
            vault_address,
            fee_receiver,
            operators,
            treasury,
            emergency_fee_bps,
            accepted_assets,
            epoch_interval_secs,
            yield_bps_per_epoch,
            journal_path,
            demo_mode,
            log_level,
        })
    }

    /// Engine configuration derived from this config
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new(self.vault_address.clone(), self.fee_receiver.clone())
            .with_emergency_fee_bps(self.emergency_fee_bps);
        config.accepted_assets = self.accepted_assets.clone();
        config
    }

    pub fn operator_set(&self) -> StaticOperators {
        StaticOperators::new(self.operators.iter().cloned())
    }

    /// The demo needs `LSTBTC_DEMO_MODE=1` on a network that permits it
    pub fn ensure_demo_allowed(&self) -> Result<(), ConfigError> {
        if !self.network.allows_demo_mode() {
            return Err(ConfigError::DemoModeNotAllowed(format!("{:?}", self.network)));
        }
        if !self.demo_mode {
            return Err(ConfigError::DemoModeDisabled);
        }
        Ok(())
    }

    /// Validate configuration for production readiness
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.network != Network::Mainnet {
            return Err(ConfigError::NetworkMismatch(
                "mainnet".to_string(),
                format!("{:?}", self.network),
            ));
        }

        if self.demo_mode {
            return Err(ConfigError::DemoModeNotAllowed("mainnet".to_string()));
        }

        if self.operators.is_empty() {
            return Err(ConfigError::MissingEnvVar("LSTBTC_OPERATORS".to_string()));
        }

        if self.journal_path.is_none() {
            return Err(ConfigError::MissingEnvVar("LSTBTC_JOURNAL_PATH".to_string()));
        }

        if self.fee_receiver == self.vault_address {
            return Err(ConfigError::InvalidValue(
                "LSTBTC_FEE_RECEIVER".to_string(),
                "must differ from the vault address".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration summary (no secrets are held, addresses are shortened)
    pub fn summary(&self) -> String {
        let assets = self
            .accepted_assets
            .iter()
            .map(|p| format!("{}@{}", p.asset, p.price))
            .collect::<Vec<_>>()
            .join(", ");

        [
            "=== lstBTC Configuration ===".to_string(),
            format!("Network: {:?}", self.network),
            format!("Vault: {}", self.vault_address.short()),
            format!("Fee Receiver: {}", self.fee_receiver.short()),
            format!("Treasury: {}", self.treasury.short()),
            format!("Operators: {}", self.operators.len()),
            format!(
                "Emergency Fee: {} bps ({} per token)",
                self.emergency_fee_bps,
                format_units(self.emergency_fee_bps as u64 * 10_000)
            ),
            format!("Accepted Assets: {}", assets),
            format!("Epoch Interval: {}s", self.epoch_interval_secs),
            format!("Keeper Yield: {} bps/epoch", self.yield_bps_per_epoch),
            format!(
                "Journal: {}",
                self.journal_path.as_deref().unwrap_or("in-memory")
            ),
            format!("Demo Mode: {}", self.demo_mode),
            format!("Log Level: {}", self.log_level),
            "============================".to_string(),
        ]
        .join("\n")
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("{}", self.summary());
    }
}

/// Get required var, or use default for devnet only
fn required_or_devnet_default<F>(
    lookup: &F,
    var_name: &str,
    devnet_default: &str,
    network: Network,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var_name) {
        Some(value) => Ok(value),
        None if network == Network::Devnet => Ok(devnet_default.to_string()),
        None => Err(ConfigError::MissingEnvVar(var_name.to_string())),
    }
}

fn required_address<F>(
    lookup: &F,
    var_name: &str,
    devnet_default: &str,
    network: Network,
) -> Result<Address, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = required_or_devnet_default(lookup, var_name, devnet_default, network)?;
    parse_address(var_name, raw.trim())
}

fn parse_address(var_name: &str, raw: &str) -> Result<Address, ConfigError> {
    raw.parse()
        .map_err(|e: crate::engine::VaultError| {
            ConfigError::InvalidValue(var_name.to_string(), e.to_string())
        })
}

fn parse_or<F, T>(lookup: &F, var_name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var_name) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::InvalidValue(var_name.to_string(), format!("cannot parse '{}'", raw))
        }),
        None => Ok(default),
    }
}
