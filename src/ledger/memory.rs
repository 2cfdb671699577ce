//! In-Memory Ledger
//!
//! Token balances held in a map. Used by the simulated keeper, the demo
//! command and the test suites. Data is lost when the process exits.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::{AssetLedger, TransferError, TransferResult};
use crate::types::{Address, Asset};

/// In-memory token ledger
///
/// Thread-safe; clones share the same balances.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    balances: Arc<RwLock<HashMap<(Address, Asset), u64>>>,
    /// When set, every transfer fails with `Unavailable`
    outage: Arc<RwLock<Option<String>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account out of thin air (faucet / test funding)
    pub async fn mint(&self, account: &Address, asset: Asset, amount: u64) {
        let mut balances = self.balances.write().await;
        let entry = balances.entry((account.clone(), asset)).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub async fn balance_of(&self, account: &Address, asset: Asset) -> u64 {
        self.balances
            .read()
            .await
            .get(&(account.clone(), asset))
            .copied()
            .unwrap_or(0)
    }

    /// Make every subsequent transfer fail until `resume` is called
    pub async fn simulate_outage(&self, reason: impl Into<String>) {
        *self.outage.write().await = Some(reason.into());
    }

    pub async fn resume(&self) {
        *self.outage.write().await = None;
    }
}

#[async_trait]
impl AssetLedger for InMemoryLedger {
    async fn transfer(
        &self,
        from: &Address,
        to: &Address,
        asset: Asset,
        amount: u64,
    ) -> TransferResult<()> {
        if let Some(reason) = self.outage.read().await.as_ref() {
            return Err(TransferError::Unavailable(reason.clone()));
        }

        let mut balances = self.balances.write().await;

        let available = balances.get(&(from.clone(), asset)).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                account: from.clone(),
                asset,
                needed: amount,
                available,
            });
        }

        balances.insert((from.clone(), asset), available - amount);
        let entry = balances.entry((to.clone(), asset)).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected(format!("balance overflow for {}", to)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[tokio::test]
    async fn test_transfer_moves_balance() {
        let ledger = InMemoryLedger::new();
        ledger.mint(&addr(1), Asset::WBtc, 1_000).await;

        ledger.transfer(&addr(1), &addr(2), Asset::WBtc, 400).await.unwrap();

        assert_eq!(ledger.balance_of(&addr(1), Asset::WBtc).await, 600);
        assert_eq!(ledger.balance_of(&addr(2), Asset::WBtc).await, 400);
        assert_eq!(ledger.balance_of(&addr(2), Asset::StCore).await, 0);
    }

    #[tokio::test]
    async fn test_insufficient_funds() {
        let ledger = InMemoryLedger::new();
        ledger.mint(&addr(1), Asset::WBtc, 10).await;

        let err = ledger
            .transfer(&addr(1), &addr(2), Asset::WBtc, 11)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InsufficientFunds { needed: 11, available: 10, .. }));
        assert_eq!(ledger.balance_of(&addr(1), Asset::WBtc).await, 10);
    }

    #[tokio::test]
    async fn test_outage() {
        let ledger = InMemoryLedger::new();
        ledger.mint(&addr(1), Asset::WBtc, 10).await;

        ledger.simulate_outage("rpc timeout").await;
        assert!(matches!(
            ledger.transfer(&addr(1), &addr(2), Asset::WBtc, 5).await,
            Err(TransferError::Unavailable(_))
        ));

        ledger.resume().await;
        ledger.transfer(&addr(1), &addr(2), Asset::WBtc, 5).await.unwrap();
    }
}
