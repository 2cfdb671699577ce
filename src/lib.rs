//! lstBTC - Epoch Vault Accounting Engine
//!
//! Users deposit wBTC / stCORE into the vault and receive lstBTC, a
//! liquid-staking token whose value in underlying grows with injected yield.
//! This crate mirrors the vault's accounting off-chain:
//!
//! 1. **Deposits** mint lstBTC at the current exchange rate and settle at once
//! 2. **Redemptions** queue until the next epoch boundary, then pay out at the
//!    rate in force at that boundary
//! 3. **Emergency redemptions** pay out immediately for a fee
//! 4. **Yield injection** raises the exchange rate for every holder
//!
//! The chain itself is an opaque [`AssetLedger`]; operator capability is an
//! [`OperatorAuthority`]. Epochs are advanced by an external job, the
//! [`EpochKeeper`].

pub mod auth;
pub mod common;
pub mod engine;
pub mod keeper;
pub mod ledger;
pub mod storage;
pub mod types;

pub use common::{config, logging};

// Re-exports: engine
pub use engine::{
    EpochReport, EpochVaultEngine, VaultBook, VaultError, VaultResult, YieldOutcome,
};

// Re-exports: collaborators
pub use auth::{OperatorAuthority, StaticOperators};
pub use ledger::{AssetLedger, InMemoryLedger, TransferError};
pub use storage::{MemoryJournal, SqliteJournal, StorageError, TransactionJournal};

// Re-exports: keeper and configuration
pub use common::{AppError, ConfigError, Network, VaultConfig};
pub use keeper::{EpochKeeper, KeeperConfig, KeeperTick};

// Re-exports: value types
pub use types::{
    Address, Asset, AssetAmount, AssetPrice, EngineConfig, Epoch, ExchangeRate,
    PendingRedemption, TransactionKind, TransactionRecord, TransactionStatus, UserAccount,
    VaultSnapshot, VaultState, UNITS_PER_TOKEN,
};
