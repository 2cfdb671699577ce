//! Ledger Trait Definitions
//!
//! The engine never holds assets itself. Every payout goes through an
//! `AssetLedger`, which in production fronts the on-chain token contracts
//! and in tests/simulation is the in-memory ledger.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Address, Asset};

/// Transfer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("insufficient {asset} in {account}: need {needed}, have {available}")]
    InsufficientFunds {
        account: Address,
        asset: Asset,
        needed: u64,
        available: u64,
    },

    #[error("transfer rejected: {0}")]
    Rejected(String),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Result type for ledger operations
pub type TransferResult<T> = Result<T, TransferError>;

/// Asset-transfer capability
///
/// Implementations:
/// - `InMemoryLedger` - balances in a map, for simulation and tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetLedger: Send + Sync {
    /// Move `amount` base units of `asset` from one account to another
    async fn transfer(
        &self,
        from: &Address,
        to: &Address,
        asset: Asset,
        amount: u64,
    ) -> TransferResult<()>;
}
