//! User Accounts
//!
//! Per-wallet liquid balance plus the queue of redemptions waiting for the
//! next epoch boundary.

use serde::{Deserialize, Serialize};

use super::{Address, Epoch};

/// A redemption request waiting for settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRedemption {
    /// ID of the `Redeem` transaction record
    pub tx_id: String,
    /// Liquid units locked for redemption
    pub amount: u64,
    /// Epoch in which the request was made
    pub request_epoch: Epoch,
    /// Failed settlement attempts so far
    pub attempts: u32,
}

impl PendingRedemption {
    /// Due once the current epoch has moved past the request epoch
    pub fn is_due(&self, current: Epoch) -> bool {
        self.request_epoch < current
    }
}

/// Accounting state of one wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub address: Address,
    /// Liquid units not queued for redemption
    pub balance: u64,
    /// Epoch of the first-ever deposit
    pub first_deposit_epoch: Option<Epoch>,
    /// Oldest first
    pub pending_redemptions: Vec<PendingRedemption>,
    pub last_settled_epoch: Option<Epoch>,
}

impl UserAccount {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balance: 0,
            first_deposit_epoch: None,
            pending_redemptions: Vec::new(),
            last_settled_epoch: None,
        }
    }

    /// Liquid units locked in pending redemptions
    pub fn pending_total(&self) -> u64 {
        self.pending_redemptions.iter().map(|p| p.amount).sum()
    }

    /// First epoch for which this account earns yield
    pub fn eligible_yield_epoch(&self) -> Option<Epoch> {
        self.first_deposit_epoch.map(Epoch::next)
    }

    pub fn is_yield_eligible(&self, epoch: Epoch) -> bool {
        self.first_deposit_epoch.map_or(false, |first| epoch > first)
    }
}
