//! Engine Error Taxonomy

use crate::types::{Asset, Epoch};

/// Errors surfaced by [`EpochVaultEngine`](super::EpochVaultEngine) operations.
///
/// Every variant except `TransferFailure` is a validation failure: the
/// operation is rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("unsupported asset: {0}")]
    UnsupportedAsset(String),

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("transfer failed: {0}")]
    TransferFailure(String),

    #[error("caller {0} is not an operator")]
    UnauthorizedOperator(String),

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("fee rate {0} bps exceeds 10000")]
    InvalidFeeRate(u16),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("arithmetic overflow")]
    MathOverflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// Result type for engine operations
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    pub(crate) fn rate_decrease(previous: impl std::fmt::Display, computed: impl std::fmt::Display) -> Self {
        Self::InvariantViolation(format!(
            "exchange rate would decrease from {} to {}",
            previous, computed
        ))
    }

    pub(crate) fn asset_not_accepted(asset: Asset) -> Self {
        Self::UnsupportedAsset(asset.symbol().to_string())
    }

    pub(crate) fn settlement_mismatch(tx_id: &str, epoch: Epoch) -> Self {
        Self::InvariantViolation(format!(
            "pending redemption {} missing at epoch {}",
            tx_id, epoch
        ))
    }

    /// Validation errors reject the call outright and are never retried.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            VaultError::TransferFailure(_) | VaultError::InvariantViolation(_)
        )
    }

    /// Get error code for operator-facing output
    pub fn error_code(&self) -> &'static str {
        match self {
            VaultError::UnsupportedAsset(_) => "UNSUPPORTED_ASSET",
            VaultError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            VaultError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            VaultError::TransferFailure(_) => "TRANSFER_FAILURE",
            VaultError::UnauthorizedOperator(_) => "UNAUTHORIZED_OPERATOR",
            VaultError::ZeroAmount => "ZERO_AMOUNT",
            VaultError::InvalidFeeRate(_) => "INVALID_FEE_RATE",
            VaultError::InvalidAddress(_) => "INVALID_ADDRESS",
            VaultError::InvalidAmount(_) => "INVALID_AMOUNT",
            VaultError::MathOverflow => "MATH_OVERFLOW",
            VaultError::DivisionByZero => "DIVISION_BY_ZERO",
        }
    }
}
