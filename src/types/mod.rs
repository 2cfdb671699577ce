//! Shared Types Module
//!
//! Value objects and records shared across the engine, ledger and journal.

pub mod account;
pub mod address;
pub mod asset;
pub mod epoch;
pub mod transaction;
pub mod units;
pub mod vault;

// Re-exports for convenience
pub use account::{PendingRedemption, UserAccount};
pub use address::Address;
pub use asset::{Asset, AssetAmount, AssetPrice};
pub use epoch::Epoch;
pub use transaction::{TransactionKind, TransactionRecord, TransactionStatus};
pub use units::{format_units, parse_units, ExchangeRate, BPS_DENOMINATOR, RATE_SCALE, UNITS_PER_TOKEN};
pub use vault::{EngineConfig, VaultSnapshot, VaultState};
