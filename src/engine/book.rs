//! Vault Book
//!
//! The synchronous accounting core: vault aggregate, account map and the
//! append-only transaction log. Every mutating method validates and computes
//! all new values first and only then writes, so a returned error always
//! leaves the book exactly as it was.
//!
//! The book never talks to the ledger. Operations that move assets out of
//! the vault are split into a plan (read-only) and a commit that the engine
//! applies after the ledger acknowledged the transfer.

use std::collections::{BTreeMap, HashMap};

use super::error::VaultError;
use super::math::{bps_of, Rounding};
use crate::types::{
    Address, AssetAmount, EngineConfig, Epoch, ExchangeRate, PendingRedemption,
    TransactionKind, TransactionRecord, UserAccount, VaultSnapshot, VaultState,
    BPS_DENOMINATOR,
};

/// A pending redemption selected for settlement at an epoch boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueRedemption {
    pub user: Address,
    pub tx_id: String,
    pub amount: u64,
    pub request_epoch: Epoch,
    /// Underlying units owed at the current rate
    pub payout: u64,
}

/// Amounts of an emergency redemption, computed before any transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyPlan {
    pub user: Address,
    pub liquid_amount: u64,
    pub fee_bps: u16,
    /// Fee in liquid units
    pub fee: u64,
    /// Underlying units sent to the user
    pub payout: u64,
    /// Underlying units owed to the fee receiver
    pub fee_underlying: u64,
}

/// Result of a yield injection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YieldOutcome {
    /// Nothing to distribute to: supply was zero. No record is appended.
    Skipped,
    Applied {
        record: TransactionRecord,
        previous_rate: ExchangeRate,
        new_rate: ExchangeRate,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultBook {
    state: VaultState,
    accounts: BTreeMap<Address, UserAccount>,
    log: Vec<TransactionRecord>,
    /// Record ID -> position in `log`
    index: HashMap<String, usize>,
}

impl VaultBook {
    /// Genesis book: epoch 0, rate 1.0, no accounts
    pub fn new() -> Self {
        Self {
            state: VaultState::genesis(),
            accounts: BTreeMap::new(),
            log: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn state(&self) -> &VaultState {
        &self.state
    }

    pub fn account(&self, user: &Address) -> Option<&UserAccount> {
        self.accounts.get(user)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &UserAccount> {
        self.accounts.values()
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.log
    }

    pub fn transaction(&self, id: &str) -> Option<&TransactionRecord> {
        self.index.get(id).and_then(|&pos| self.log.get(pos))
    }

    pub fn snapshot(&self) -> VaultSnapshot {
        let pending_redemptions = self
            .accounts
            .values()
            .map(|a| a.pending_redemptions.len())
            .sum();
        let pending_liquid = self.accounts.values().map(|a| a.pending_total()).sum();

        VaultSnapshot {
            state: self.state.clone(),
            accounts: self.accounts.len(),
            pending_redemptions,
            pending_liquid,
            transactions: self.log.len(),
        }
    }

    /// Underlying value of a user's liquid balance at the current rate
    pub fn claimable_underlying(&self, user: &Address) -> Result<u64, VaultError> {
        let balance = self.account(user).map_or(0, |a| a.balance);
        self.state.exchange_rate.to_underlying(balance, Rounding::Floor)
    }

    /// Check `total_supply == Σ balance + Σ pending`
    pub fn check_supply_invariant(&self) -> Result<(), VaultError> {
        let mut accounted: u128 = 0;
        for account in self.accounts.values() {
            accounted += account.balance as u128 + account.pending_total() as u128;
        }

        if accounted != self.state.total_supply as u128 {
            return Err(VaultError::InvariantViolation(format!(
                "total supply {} != accounted {}",
                self.state.total_supply, accounted
            )));
        }

        Ok(())
    }

    // ========================================================================
    // Deposits and redemptions
    // ========================================================================

    /// Mint liquid units for whitelisted underlying assets. Settles immediately.
    pub fn deposit(
        &mut self,
        user: &Address,
        amounts: &[AssetAmount],
        config: &EngineConfig,
    ) -> Result<TransactionRecord, VaultError> {
        let mut value: u64 = 0;
        for entry in amounts {
            let price = config
                .price_of(entry.asset)
                .ok_or_else(|| VaultError::asset_not_accepted(entry.asset))?;
            let worth = price.to_underlying(entry.amount, Rounding::Floor)?;
            value = value.checked_add(worth).ok_or(VaultError::MathOverflow)?;
        }

        if value == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let minted = self.state.exchange_rate.to_liquid(value, Rounding::Floor)?;
        if minted == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let total_supply = self
            .state
            .total_supply
            .checked_add(minted)
            .ok_or(VaultError::MathOverflow)?;
        let total_underlying = self
            .state
            .total_underlying_held
            .checked_add(value)
            .ok_or(VaultError::MathOverflow)?;
        let balance = self
            .account(user)
            .map_or(0, |a| a.balance)
            .checked_add(minted)
            .ok_or(VaultError::MathOverflow)?;

        let epoch = self.state.current_epoch;
        let account = self
            .accounts
            .entry(user.clone())
            .or_insert_with(|| UserAccount::new(user.clone()));
        account.balance = balance;
        account.first_deposit_epoch.get_or_insert(epoch);
        account.last_settled_epoch = Some(epoch);

        self.state.total_supply = total_supply;
        self.state.total_underlying_held = total_underlying;

        let mut record = TransactionRecord::new(user.clone(), TransactionKind::Deposit, epoch)
            .with_assets(amounts.to_vec())
            .with_liquid(minted)
            .with_underlying(value);
        record.mark_settled(epoch);

        Ok(self.append(record))
    }

    /// Queue liquid units for settlement at the next epoch boundary
    pub fn redeem(&mut self, user: &Address, amount: u64) -> Result<TransactionRecord, VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let epoch = self.state.current_epoch;
        let account = match self.accounts.get_mut(user) {
            Some(account) if account.balance >= amount => account,
            other => {
                return Err(VaultError::InsufficientBalance {
                    requested: amount,
                    available: other.map_or(0, |a| a.balance),
                })
            }
        };

        let record = TransactionRecord::new(user.clone(), TransactionKind::Redeem, epoch)
            .with_liquid(amount);

        account.balance -= amount;
        account.pending_redemptions.push(PendingRedemption {
            tx_id: record.id.clone(),
            amount,
            request_epoch: epoch,
            attempts: 0,
        });

        Ok(self.append(record))
    }

    /// Compute an emergency redemption without touching state
    pub fn plan_emergency(
        &self,
        user: &Address,
        amount: u64,
        fee_bps: u16,
    ) -> Result<EmergencyPlan, VaultError> {
        if fee_bps as u64 > BPS_DENOMINATOR {
            return Err(VaultError::InvalidFeeRate(fee_bps));
        }
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let available = self.account(user).map_or(0, |a| a.balance);
        if amount > available {
            return Err(VaultError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let rate = self.state.exchange_rate;
        let fee = bps_of(amount, fee_bps)?;
        let payout = rate.to_underlying(amount - fee, Rounding::Floor)?;
        let fee_underlying = rate.to_underlying(fee, Rounding::Floor)?;

        let outflow = payout
            .checked_add(fee_underlying)
            .ok_or(VaultError::MathOverflow)?;
        if outflow > self.state.total_underlying_held {
            return Err(VaultError::InvariantViolation(format!(
                "emergency outflow {} exceeds underlying held {}",
                outflow, self.state.total_underlying_held
            )));
        }

        Ok(EmergencyPlan {
            user: user.clone(),
            liquid_amount: amount,
            fee_bps,
            fee,
            payout,
            fee_underlying,
        })
    }

    /// Apply an emergency redemption whose user payout was delivered.
    ///
    /// When the fee transfer did not go through, the fee is kept in
    /// `fees_owed` and swept at a later epoch boundary.
    pub fn commit_emergency(
        &mut self,
        plan: &EmergencyPlan,
        fee_delivered: bool,
    ) -> Result<TransactionRecord, VaultError> {
        let available = self.account(&plan.user).map_or(0, |a| a.balance);
        if plan.liquid_amount > available {
            return Err(VaultError::InsufficientBalance {
                requested: plan.liquid_amount,
                available,
            });
        }

        let total_supply = self
            .state
            .total_supply
            .checked_sub(plan.liquid_amount)
            .ok_or_else(|| VaultError::InvariantViolation("total supply underflow".to_string()))?;
        let total_underlying = self
            .state
            .total_underlying_held
            .checked_sub(plan.payout + plan.fee_underlying)
            .ok_or_else(|| {
                VaultError::InvariantViolation("underlying held underflow".to_string())
            })?;
        let fees_owed = if fee_delivered {
            self.state.fees_owed
        } else {
            self.state
                .fees_owed
                .checked_add(plan.fee_underlying)
                .ok_or(VaultError::MathOverflow)?
        };

        let epoch = self.state.current_epoch;
        if let Some(account) = self.accounts.get_mut(&plan.user) {
            account.balance -= plan.liquid_amount;
            account.last_settled_epoch = Some(epoch);
        }
        self.state.total_supply = total_supply;
        self.state.total_underlying_held = total_underlying;
        self.state.fees_owed = fees_owed;

        let mut record =
            TransactionRecord::new(plan.user.clone(), TransactionKind::EmergencyRedeem, epoch)
                .with_liquid(plan.liquid_amount)
                .with_underlying(plan.payout)
                .with_fee(plan.fee);
        record.mark_settled(epoch);
        if !fee_delivered {
            record.error = Some(format!(
                "fee transfer of {} deferred to next epoch",
                plan.fee_underlying
            ));
        }

        Ok(self.append(record))
    }

    /// Log an emergency redemption the ledger refused. State is untouched.
    pub fn record_failed_emergency(&mut self, plan: &EmergencyPlan, error: String) -> TransactionRecord {
        let mut record = TransactionRecord::new(
            plan.user.clone(),
            TransactionKind::EmergencyRedeem,
            self.state.current_epoch,
        )
        .with_liquid(plan.liquid_amount)
        .with_underlying(plan.payout)
        .with_fee(plan.fee);
        record.mark_failed(error);

        self.append(record)
    }

    // ========================================================================
    // Epoch boundary
    // ========================================================================

    /// Move to the next epoch
    pub fn open_epoch(&mut self) -> Epoch {
        self.state.current_epoch = self.state.current_epoch.next();
        self.state.current_epoch
    }

    /// Pending redemptions due at the current epoch, oldest first per account
    pub fn due_redemptions(&self) -> Result<Vec<DueRedemption>, VaultError> {
        self.due_at(self.state.current_epoch)
    }

    /// Pending redemptions that would be due once `current` is reached
    pub fn due_at(&self, current: Epoch) -> Result<Vec<DueRedemption>, VaultError> {
        let rate = self.state.exchange_rate;
        let mut due = Vec::new();

        for account in self.accounts.values() {
            for pending in account.pending_redemptions.iter().filter(|p| p.is_due(current)) {
                due.push(DueRedemption {
                    user: account.address.clone(),
                    tx_id: pending.tx_id.clone(),
                    amount: pending.amount,
                    request_epoch: pending.request_epoch,
                    payout: rate.to_underlying(pending.amount, Rounding::Floor)?,
                });
            }
        }

        Ok(due)
    }

    /// Apply a redemption whose payout the ledger acknowledged
    pub fn settle(&mut self, due: &DueRedemption) -> Result<TransactionRecord, VaultError> {
        let epoch = self.state.current_epoch;
        let account = self
            .accounts
            .get_mut(&due.user)
            .ok_or_else(|| VaultError::settlement_mismatch(&due.tx_id, epoch))?;
        let pos = account
            .pending_redemptions
            .iter()
            .position(|p| p.tx_id == due.tx_id)
            .ok_or_else(|| VaultError::settlement_mismatch(&due.tx_id, epoch))?;

        let total_supply = self
            .state
            .total_supply
            .checked_sub(due.amount)
            .ok_or_else(|| VaultError::InvariantViolation("total supply underflow".to_string()))?;
        let total_underlying = self
            .state
            .total_underlying_held
            .checked_sub(due.payout)
            .ok_or_else(|| {
                VaultError::InvariantViolation("underlying held underflow".to_string())
            })?;

        account.pending_redemptions.remove(pos);
        account.last_settled_epoch = Some(epoch);
        self.state.total_supply = total_supply;
        self.state.total_underlying_held = total_underlying;

        self.update_record(&due.tx_id, |record| {
            record.underlying_amount = due.payout;
            record.mark_settled(epoch);
        })
        .ok_or_else(|| VaultError::settlement_mismatch(&due.tx_id, epoch))
    }

    /// Note a failed payout; the entry stays pending for the next boundary
    pub fn defer_settlement(&mut self, due: &DueRedemption, error: String) -> Option<TransactionRecord> {
        if let Some(pending) = self
            .accounts
            .get_mut(&due.user)
            .and_then(|a| a.pending_redemptions.iter_mut().find(|p| p.tx_id == due.tx_id))
        {
            pending.attempts += 1;
        }

        self.update_record(&due.tx_id, |record| record.record_attempt_failure(error))
    }

    /// Mark `amount` of owed emergency fees as delivered
    pub fn clear_fees_owed(&mut self, amount: u64) {
        self.state.fees_owed = self.state.fees_owed.saturating_sub(amount);
    }

    // ========================================================================
    // Yield
    // ========================================================================

    /// Add underlying to the vault and rebase the exchange rate
    pub fn inject_yield(&mut self, operator: &Address, amount: u64) -> Result<YieldOutcome, VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if self.state.total_supply == 0 {
            return Ok(YieldOutcome::Skipped);
        }

        let total_underlying = self
            .state
            .total_underlying_held
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        let new_rate = ExchangeRate::from_ratio(total_underlying, self.state.total_supply)?;
        let previous_rate = self.state.exchange_rate;

        if new_rate < previous_rate {
            return Err(VaultError::rate_decrease(previous_rate, new_rate));
        }

        let epoch = self.state.current_epoch;
        self.state.total_underlying_held = total_underlying;
        self.state.exchange_rate = new_rate;

        let mut record =
            TransactionRecord::new(operator.clone(), TransactionKind::YieldInjection, epoch)
                .with_underlying(amount);
        record.mark_settled(epoch);

        Ok(YieldOutcome::Applied {
            record: self.append(record),
            previous_rate,
            new_rate,
        })
    }

    fn append(&mut self, record: TransactionRecord) -> TransactionRecord {
        self.index.insert(record.id.clone(), self.log.len());
        self.log.push(record.clone());
        record
    }

    fn update_record<F>(&mut self, id: &str, f: F) -> Option<TransactionRecord>
    where
        F: FnOnce(&mut TransactionRecord),
    {
        let pos = *self.index.get(id)?;
        let record = self.log.get_mut(pos)?;
        f(record);
        Some(record.clone())
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut VaultState {
        &mut self.state
    }
}

impl Default for VaultBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Asset, TransactionStatus, UNITS_PER_TOKEN};

    const ONE: u64 = UNITS_PER_TOKEN;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn config() -> EngineConfig {
        EngineConfig::new(addr(0xee), addr(0xfe))
    }

    fn wbtc(amount: u64) -> Vec<AssetAmount> {
        vec![AssetAmount::new(Asset::WBtc, amount)]
    }

    #[test]
    fn test_deposit_mints_at_rate() {
        let mut book = VaultBook::new();
        let record = book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();

        assert_eq!(record.status, TransactionStatus::Settled);
        assert_eq!(record.liquid_amount, ONE);
        assert_eq!(book.state().total_supply, ONE);
        assert_eq!(book.state().total_underlying_held, ONE);

        let account = book.account(&addr(1)).unwrap();
        assert_eq!(account.balance, ONE);
        assert_eq!(account.first_deposit_epoch, Some(Epoch(0)));
    }

    #[test]
    fn test_first_deposit_epoch_is_sticky() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();
        book.open_epoch();
        book.open_epoch();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();

        let account = book.account(&addr(1)).unwrap();
        assert_eq!(account.first_deposit_epoch, Some(Epoch(0)));
        assert_eq!(account.last_settled_epoch, Some(Epoch(2)));
    }

    #[test]
    fn test_multi_asset_deposit_uses_prices() {
        let config = config().with_asset(Asset::StCore, "0.5".parse().unwrap());
        let mut book = VaultBook::new();

        let amounts = vec![
            AssetAmount::new(Asset::WBtc, ONE),
            AssetAmount::new(Asset::StCore, 2 * ONE),
        ];
        let record = book.deposit(&addr(1), &amounts, &config).unwrap();

        assert_eq!(record.underlying_amount, 2 * ONE);
        assert_eq!(record.liquid_amount, 2 * ONE);
        assert_eq!(record.asset_amounts.len(), 2);
    }

    #[test]
    fn test_rejected_deposit_leaves_book_untouched() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();
        let before = book.clone();

        // stCORE listed after an accepted asset: the whole call is rejected
        let amounts = vec![
            AssetAmount::new(Asset::WBtc, ONE),
            AssetAmount::new(Asset::StCore, ONE),
        ];
        let err = book.deposit(&addr(2), &amounts, &config()).unwrap_err();
        assert_eq!(err, VaultError::UnsupportedAsset("stCORE".to_string()));
        assert_eq!(book, before);

        assert_eq!(book.deposit(&addr(2), &wbtc(0), &config()), Err(VaultError::ZeroAmount));
        assert_eq!(book.deposit(&addr(2), &[], &config()), Err(VaultError::ZeroAmount));
        assert_eq!(book, before);
    }

    #[test]
    fn test_redeem_moves_balance_to_pending() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();

        let record = book.redeem(&addr(1), ONE / 4).unwrap();
        assert_eq!(record.status, TransactionStatus::Pending);

        let account = book.account(&addr(1)).unwrap();
        assert_eq!(account.balance, ONE * 3 / 4);
        assert_eq!(account.pending_total(), ONE / 4);
        assert_eq!(account.pending_redemptions[0].tx_id, record.id);
        assert_eq!(book.state().total_supply, ONE);
        book.check_supply_invariant().unwrap();
    }

    #[test]
    fn test_redeem_insufficient_balance() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();
        let before = book.clone();

        assert_eq!(
            book.redeem(&addr(1), ONE + 1),
            Err(VaultError::InsufficientBalance { requested: ONE + 1, available: ONE })
        );
        assert_eq!(
            book.redeem(&addr(9), 1),
            Err(VaultError::InsufficientBalance { requested: 1, available: 0 })
        );
        assert_eq!(book, before);
    }

    #[test]
    fn test_due_only_after_boundary() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();
        book.redeem(&addr(1), ONE).unwrap();

        assert!(book.due_redemptions().unwrap().is_empty());

        book.open_epoch();
        let due = book.due_redemptions().unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].payout, ONE);
        assert_eq!(due[0].request_epoch, Epoch(0));
    }

    #[test]
    fn test_settle_removes_entry_once() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();
        book.redeem(&addr(1), ONE).unwrap();
        book.open_epoch();

        let due = book.due_redemptions().unwrap().remove(0);
        let record = book.settle(&due).unwrap();
        assert_eq!(record.status, TransactionStatus::Settled);
        assert_eq!(record.settlement_epoch, Some(Epoch(1)));
        assert_eq!(book.state().total_supply, 0);
        assert_eq!(book.state().total_underlying_held, 0);

        // A second settlement of the same entry is refused
        assert!(matches!(book.settle(&due), Err(VaultError::InvariantViolation(_))));
        assert!(book.due_redemptions().unwrap().is_empty());
    }

    #[test]
    fn test_defer_keeps_entry_pending() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();
        book.redeem(&addr(1), ONE).unwrap();
        book.open_epoch();

        let due = book.due_redemptions().unwrap().remove(0);
        let record = book.defer_settlement(&due, "ledger offline".to_string()).unwrap();
        assert!(record.is_pending());
        assert_eq!(record.attempts, 1);
        assert_eq!(book.account(&addr(1)).unwrap().pending_redemptions[0].attempts, 1);

        book.open_epoch();
        assert_eq!(book.due_redemptions().unwrap().len(), 1);
    }

    #[test]
    fn test_yield_rebases_rate() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();

        let outcome = book.inject_yield(&addr(0xee), 2_000_000).unwrap();
        match outcome {
            YieldOutcome::Applied { previous_rate, new_rate, record } => {
                assert_eq!(previous_rate, ExchangeRate::ONE);
                assert_eq!(new_rate.to_string(), "1.02");
                assert_eq!(record.kind, TransactionKind::YieldInjection);
            }
            YieldOutcome::Skipped => panic!("yield should apply"),
        }
        assert_eq!(book.claimable_underlying(&addr(1)).unwrap(), 102_000_000);
    }

    #[test]
    fn test_yield_skipped_without_supply() {
        let mut book = VaultBook::new();
        let before = book.clone();

        assert_eq!(book.inject_yield(&addr(0xee), ONE).unwrap(), YieldOutcome::Skipped);
        assert_eq!(book, before);
        assert!(book.transactions().is_empty());
    }

    #[test]
    fn test_yield_rejects_rate_decrease() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();
        // Corrupt the aggregate so a rebase would shrink the rate
        book.state_mut().total_underlying_held = ONE / 2;
        let before = book.clone();

        let err = book.inject_yield(&addr(0xee), 1).unwrap_err();
        assert!(matches!(err, VaultError::InvariantViolation(_)));
        assert_eq!(book, before);
    }

    #[test]
    fn test_emergency_plan_and_commit() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();

        let plan = book.plan_emergency(&addr(1), ONE, 100).unwrap();
        assert_eq!(plan.fee, ONE / 100);
        assert_eq!(plan.payout, 99_000_000);
        assert_eq!(plan.fee_underlying, 1_000_000);

        let record = book.commit_emergency(&plan, false).unwrap();
        assert_eq!(record.status, TransactionStatus::Settled);
        assert!(record.error.is_some());
        assert_eq!(book.state().total_supply, 0);
        assert_eq!(book.state().total_underlying_held, 0);
        assert_eq!(book.state().fees_owed, 1_000_000);

        book.clear_fees_owed(1_000_000);
        assert_eq!(book.state().fees_owed, 0);
    }

    #[test]
    fn test_emergency_validation() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();

        assert_eq!(
            book.plan_emergency(&addr(1), ONE, 10_001),
            Err(VaultError::InvalidFeeRate(10_001))
        );
        assert_eq!(book.plan_emergency(&addr(1), 0, 100), Err(VaultError::ZeroAmount));
        assert!(matches!(
            book.plan_emergency(&addr(1), ONE + 1, 100),
            Err(VaultError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_failed_emergency_is_logged_without_effect() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();
        let state_before = book.state().clone();

        let plan = book.plan_emergency(&addr(1), ONE, 100).unwrap();
        let record = book.record_failed_emergency(&plan, "rejected".to_string());

        assert_eq!(record.status, TransactionStatus::Failed);
        assert_eq!(book.state(), &state_before);
        assert_eq!(book.account(&addr(1)).unwrap().balance, ONE);
        assert_eq!(book.transactions().len(), 2);
    }

    #[test]
    fn test_invariant_detects_drift() {
        let mut book = VaultBook::new();
        book.deposit(&addr(1), &wbtc(ONE), &config()).unwrap();
        book.check_supply_invariant().unwrap();

        book.state_mut().total_supply += 1;
        assert!(book.check_supply_invariant().is_err());
    }
}
