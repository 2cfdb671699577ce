//! Vault Engine Module
//!
//! Epoch-based deposit, redemption and yield accounting.
//!
//! This module contains:
//! - `VaultBook`: synchronous state machine over the vault aggregate
//! - `EpochVaultEngine`: async front that serializes mutations and drives the ledger
//! - Fixed-point helpers and the engine error taxonomy

pub mod book;
pub mod error;
pub mod math;
pub mod service;

// Re-exports for convenience
pub use book::{DueRedemption, EmergencyPlan, VaultBook, YieldOutcome};
pub use error::{VaultError, VaultResult};
pub use math::Rounding;
pub use service::{EpochReport, EpochVaultEngine};
