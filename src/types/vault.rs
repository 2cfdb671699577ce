//! Vault Types
//!
//! Process-wide aggregate state and engine configuration.

use serde::{Deserialize, Serialize};

use super::{Address, Asset, AssetPrice, Epoch, ExchangeRate};

/// Aggregate vault accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    pub current_epoch: Epoch,
    /// Σ balances + Σ pending redemption amounts
    pub total_supply: u64,
    pub exchange_rate: ExchangeRate,
    pub total_underlying_held: u64,
    /// Emergency fees already deducted but not yet delivered to the fee receiver
    pub fees_owed: u64,
}

impl VaultState {
    pub fn genesis() -> Self {
        Self {
            current_epoch: Epoch::GENESIS,
            total_supply: 0,
            exchange_rate: ExchangeRate::ONE,
            total_underlying_held: 0,
            fees_owed: 0,
        }
    }
}

impl Default for VaultState {
    fn default() -> Self {
        Self::genesis()
    }
}

/// Point-in-time summary for queries and status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub state: VaultState,
    pub accounts: usize,
    pub pending_redemptions: usize,
    /// Liquid units locked in pending redemptions
    pub pending_liquid: u64,
    pub transactions: usize,
}

impl std::fmt::Display for VaultSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "epoch {} | supply {} | underlying {} | rate {} | accounts {} | pending {} ({}) | txs {}",
            self.state.current_epoch,
            super::units::format_units(self.state.total_supply),
            super::units::format_units(self.state.total_underlying_held),
            self.state.exchange_rate,
            self.accounts,
            self.pending_redemptions,
            super::units::format_units(self.pending_liquid),
            self.transactions
        )
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ledger account holding the vault's underlying assets
    pub vault_address: Address,
    /// Receives emergency redemption fees
    pub fee_receiver: Address,
    /// Asset paid out on redemption
    pub payout_asset: Asset,
    /// Default emergency redemption fee
    pub emergency_fee_bps: u16,
    /// Deposit whitelist
    pub accepted_assets: Vec<AssetPrice>,
}

impl EngineConfig {
    /// wBTC-only vault with the default 1% emergency fee
    pub fn new(vault_address: Address, fee_receiver: Address) -> Self {
        Self {
            vault_address,
            fee_receiver,
            payout_asset: Asset::WBtc,
            emergency_fee_bps: 100,
            accepted_assets: vec![AssetPrice::new(Asset::WBtc, ExchangeRate::ONE)],
        }
    }

    /// Accept another asset at the given price (replaces an existing entry)
    pub fn with_asset(mut self, asset: Asset, price: ExchangeRate) -> Self {
        self.accepted_assets.retain(|p| p.asset != asset);
        self.accepted_assets.push(AssetPrice::new(asset, price));
        self
    }

    pub fn with_emergency_fee_bps(mut self, bps: u16) -> Self {
        self.emergency_fee_bps = bps;
        self
    }

    pub fn price_of(&self, asset: Asset) -> Option<ExchangeRate> {
        self.accepted_assets
            .iter()
            .find(|p| p.asset == asset)
            .map(|p| p.price)
    }
}
