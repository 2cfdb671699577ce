//! Ledger Module
//!
//! The external asset-transfer collaborator.

pub mod memory;
pub mod traits;

// Re-exports for convenience
pub use memory::InMemoryLedger;
pub use traits::{AssetLedger, TransferError, TransferResult};

#[cfg(test)]
pub use traits::MockAssetLedger;
