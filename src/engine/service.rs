//! Epoch Vault Engine
//!
//! Async front of the [`VaultBook`]: serializes mutations, talks to the
//! ledger, checks operator capability and mirrors records to the journal.
//!
//! Lock order is always `writer` then `book`. The book lock is never held
//! across a ledger call; state is committed only after the ledger
//! acknowledged the transfer.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::book::{DueRedemption, VaultBook, YieldOutcome};
use super::error::{VaultError, VaultResult};
use crate::auth::OperatorAuthority;
use crate::common::logging::{
    generate_correlation_id, log_deposit_event, log_epoch_event, log_redemption_event,
    log_security_event, log_yield_event,
};
use crate::ledger::AssetLedger;
use crate::storage::TransactionJournal;
use crate::types::{
    format_units, Address, AssetAmount, EngineConfig, Epoch, PendingRedemption,
    TransactionRecord, UserAccount, VaultSnapshot, VaultState,
};

/// Outcome of one epoch boundary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpochReport {
    /// The epoch that was opened
    pub epoch: Epoch,
    /// Redemptions paid out
    pub settled: usize,
    /// Redemptions whose payout failed and stay pending
    pub deferred: usize,
    /// Underlying units sent to users
    pub paid_out: u64,
    /// Owed emergency fees delivered to the fee receiver
    pub fees_swept: u64,
}

impl EpochReport {
    pub fn has_activity(&self) -> bool {
        self.settled > 0 || self.deferred > 0 || self.fees_swept > 0
    }
}

impl fmt::Display for EpochReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epoch {}: settled={}, deferred={}, paid_out={}, fees_swept={}",
            self.epoch,
            self.settled,
            self.deferred,
            format_units(self.paid_out),
            format_units(self.fees_swept)
        )
    }
}

/// Epoch-aligned vault accounting engine
pub struct EpochVaultEngine {
    config: EngineConfig,
    ledger: Arc<dyn AssetLedger>,
    authority: Arc<dyn OperatorAuthority>,
    journal: Option<Arc<dyn TransactionJournal>>,
    /// Serializes every mutation
    writer: Mutex<()>,
    book: RwLock<VaultBook>,
}

impl EpochVaultEngine {
    /// Create an engine at genesis
    pub fn new(
        config: EngineConfig,
        ledger: Arc<dyn AssetLedger>,
        authority: Arc<dyn OperatorAuthority>,
    ) -> Self {
        Self {
            config,
            ledger,
            authority,
            journal: None,
            writer: Mutex::new(()),
            book: RwLock::new(VaultBook::new()),
        }
    }

    /// Mirror every appended or updated record to `journal`
    pub fn with_journal(mut self, journal: Arc<dyn TransactionJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // User operations
    // ========================================================================

    /// Mint liquid units for whitelisted underlying assets.
    ///
    /// The deposited assets reach the vault account on-chain; the engine
    /// mirrors the effect and does not pull them through the ledger.
    pub async fn deposit(
        &self,
        user: &Address,
        amounts: &[AssetAmount],
    ) -> VaultResult<TransactionRecord> {
        let _gate = self.writer.lock().await;

        let result = self.book.write().await.deposit(user, amounts, &self.config);
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(target: "lstbtc::deposit", user = %user, error = %e, "Deposit rejected");
                return Err(e);
            }
        };

        log_deposit_event(
            "deposit_settled",
            &record.id,
            user.as_str(),
            record.liquid_amount,
            record.underlying_amount,
            None,
        );
        self.mirror(&record).await;

        Ok(record)
    }

    /// Queue liquid units for settlement at the next epoch boundary
    pub async fn redeem(&self, user: &Address, amount: u64) -> VaultResult<TransactionRecord> {
        let _gate = self.writer.lock().await;

        let result = self.book.write().await.redeem(user, amount);
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(target: "lstbtc::redemption", user = %user, amount, error = %e, "Redemption rejected");
                return Err(e);
            }
        };

        log_redemption_event(
            "redeem_requested",
            &record.id,
            user.as_str(),
            amount,
            0,
            record.request_epoch.value(),
            None,
        );
        self.mirror(&record).await;

        Ok(record)
    }

    /// Redeem immediately for a fee. `fee_bps` defaults to the configured rate.
    ///
    /// A refused payout returns `TransferFailure` and changes no state. A
    /// refused fee transfer still commits the redemption; the fee is owed and
    /// swept at the next epoch boundary.
    pub async fn emergency_redeem(
        &self,
        user: &Address,
        amount: u64,
        fee_bps: Option<u16>,
    ) -> VaultResult<TransactionRecord> {
        let _gate = self.writer.lock().await;

        let fee_bps = fee_bps.unwrap_or(self.config.emergency_fee_bps);
        let plan = self.book.read().await.plan_emergency(user, amount, fee_bps)?;

        if plan.payout > 0 {
            if let Err(e) = self
                .ledger
                .transfer(&self.config.vault_address, user, self.config.payout_asset, plan.payout)
                .await
            {
                let reason = e.to_string();
                let record = self
                    .book
                    .write()
                    .await
                    .record_failed_emergency(&plan, reason.clone());

                log_redemption_event(
                    "emergency_redeem_failed",
                    &record.id,
                    user.as_str(),
                    amount,
                    plan.payout,
                    record.request_epoch.value(),
                    Some(&reason),
                );
                self.mirror(&record).await;

                return Err(VaultError::TransferFailure(reason));
            }
        }

        let fee_delivered = plan.fee_underlying == 0
            || match self
                .ledger
                .transfer(
                    &self.config.vault_address,
                    &self.config.fee_receiver,
                    self.config.payout_asset,
                    plan.fee_underlying,
                )
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        target: "lstbtc::redemption",
                        fee = plan.fee_underlying,
                        error = %e,
                        "Fee transfer failed, owing fee until next epoch"
                    );
                    false
                }
            };

        let record = self.book.write().await.commit_emergency(&plan, fee_delivered)?;

        log_redemption_event(
            "emergency_redeem_settled",
            &record.id,
            user.as_str(),
            amount,
            plan.payout,
            record.request_epoch.value(),
            None,
        );
        self.mirror(&record).await;

        Ok(record)
    }

    // ========================================================================
    // Operator operations
    // ========================================================================

    /// Add underlying to the vault and rebase the exchange rate
    pub async fn inject_yield(&self, caller: &Address, amount: u64) -> VaultResult<YieldOutcome> {
        self.authorize(caller, "inject_yield")?;
        let _gate = self.writer.lock().await;

        self.apply_yield(caller, amount).await
    }

    /// Move `amount` from `source` into the vault and inject it as yield.
    ///
    /// Funding and injection share one writer hold: the funded amount is
    /// either recorded in the book or sent back to `source`.
    pub async fn inject_funded_yield(
        &self,
        caller: &Address,
        source: &Address,
        amount: u64,
    ) -> VaultResult<YieldOutcome> {
        self.authorize(caller, "inject_yield")?;
        let _gate = self.writer.lock().await;

        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if self.book.read().await.state().total_supply == 0 {
            tracing::info!(target: "lstbtc::yield", amount, "No supply, yield funding skipped");
            return Ok(YieldOutcome::Skipped);
        }

        if let Err(e) = self
            .ledger
            .transfer(
                source,
                &self.config.vault_address,
                self.config.payout_asset,
                amount,
            )
            .await
        {
            let rate = self.book.read().await.state().exchange_rate.to_string();
            log_yield_event("yield_unfunded", amount, &rate, &rate, Some(&e.to_string()));
            return Err(VaultError::TransferFailure(e.to_string()));
        }

        let result = self.apply_yield(caller, amount).await;
        if !matches!(result, Ok(YieldOutcome::Applied { .. })) {
            self.refund_yield(source, amount).await;
        }

        result
    }

    async fn refund_yield(&self, source: &Address, amount: u64) {
        match self
            .ledger
            .transfer(
                &self.config.vault_address,
                source,
                self.config.payout_asset,
                amount,
            )
            .await
        {
            Ok(()) => {
                tracing::info!(target: "lstbtc::yield", amount, source = %source, "Undistributed yield returned");
            }
            Err(e) => {
                tracing::error!(target: "lstbtc::yield", amount, source = %source, error = %e, "Undistributed yield could not be returned");
            }
        }
    }

    /// Caller must hold the writer gate
    async fn apply_yield(&self, caller: &Address, amount: u64) -> VaultResult<YieldOutcome> {
        let result = self.book.write().await.inject_yield(caller, amount);
        match &result {
            Ok(YieldOutcome::Applied {
                record,
                previous_rate,
                new_rate,
            }) => {
                log_yield_event(
                    "yield_injected",
                    amount,
                    &previous_rate.to_string(),
                    &new_rate.to_string(),
                    None,
                );
                self.mirror(record).await;
            }
            Ok(YieldOutcome::Skipped) => {
                tracing::info!(target: "lstbtc::yield", amount, "No supply, yield injection skipped");
            }
            Err(e @ VaultError::InvariantViolation(_)) => {
                let rate = self.book.read().await.state().exchange_rate.to_string();
                log_yield_event("yield_rejected", amount, &rate, &rate, Some(&e.to_string()));
                tracing::error!(target: "lstbtc::yield", error = %e, "Yield injection violates invariant");
            }
            Err(e) => {
                tracing::warn!(target: "lstbtc::yield", amount, error = %e, "Yield injection rejected");
            }
        }

        result
    }

    /// Open the next epoch and settle every redemption that became due
    pub async fn advance_epoch(&self, caller: &Address) -> VaultResult<EpochReport> {
        self.authorize(caller, "advance_epoch")?;
        let _gate = self.writer.lock().await;

        self.advance_locked().await
    }

    /// Advance until `target` is reached. Empty when already there.
    pub async fn advance_epoch_to(
        &self,
        caller: &Address,
        target: Epoch,
    ) -> VaultResult<Vec<EpochReport>> {
        self.authorize(caller, "advance_epoch")?;
        let _gate = self.writer.lock().await;

        let mut reports = Vec::new();
        while self.book.read().await.state().current_epoch < target {
            reports.push(self.advance_locked().await?);
        }

        if reports.is_empty() {
            tracing::debug!(target: "lstbtc::epoch", target = %target, "Epoch already reached");
        }

        Ok(reports)
    }

    /// Caller must hold the writer gate
    async fn advance_locked(&self) -> VaultResult<EpochReport> {
        let (epoch, due) = {
            let mut book = self.book.write().await;
            let next = book.state().current_epoch.next();
            let due = book.due_at(next)?;
            (book.open_epoch(), due)
        };

        let mut report = EpochReport {
            epoch,
            ..Default::default()
        };

        for entry in due {
            match self.pay_out(&entry).await {
                Ok(()) => {
                    let settled = self.book.write().await.settle(&entry);
                    let record = match settled {
                        Ok(record) => record,
                        Err(e) => {
                            // The epoch is already open; the other entries still settle
                            tracing::error!(target: "lstbtc::redemption", tx_id = %entry.tx_id, payout = entry.payout, error = %e, "Settlement failed after payout");
                            continue;
                        }
                    };

                    report.settled += 1;
                    report.paid_out = report.paid_out.saturating_add(entry.payout);
                    log_redemption_event(
                        "redeem_settled",
                        &record.id,
                        entry.user.as_str(),
                        entry.amount,
                        entry.payout,
                        epoch.value(),
                        None,
                    );
                    self.mirror(&record).await;
                }
                Err(e) => {
                    let reason = e.to_string();
                    let record = self.book.write().await.defer_settlement(&entry, reason.clone());

                    report.deferred += 1;
                    log_redemption_event(
                        "redeem_deferred",
                        &entry.tx_id,
                        entry.user.as_str(),
                        entry.amount,
                        entry.payout,
                        epoch.value(),
                        Some(&reason),
                    );
                    if let Some(record) = record {
                        self.mirror(&record).await;
                    }
                }
            }
        }

        report.fees_swept = self.sweep_fees().await;

        if let Err(e) = self.book.read().await.check_supply_invariant() {
            tracing::error!(target: "lstbtc::epoch", epoch = %epoch, error = %e, "Supply invariant broken at boundary");
            return Err(e);
        }

        log_epoch_event(epoch.value(), report.settled, report.deferred, report.paid_out);
        Ok(report)
    }

    async fn pay_out(&self, entry: &DueRedemption) -> Result<(), crate::ledger::TransferError> {
        if entry.payout == 0 {
            return Ok(());
        }
        self.ledger
            .transfer(
                &self.config.vault_address,
                &entry.user,
                self.config.payout_asset,
                entry.payout,
            )
            .await
    }

    /// Retry delivery of emergency fees whose transfer failed earlier
    async fn sweep_fees(&self) -> u64 {
        let owed = self.book.read().await.state().fees_owed;
        if owed == 0 {
            return 0;
        }

        match self
            .ledger
            .transfer(
                &self.config.vault_address,
                &self.config.fee_receiver,
                self.config.payout_asset,
                owed,
            )
            .await
        {
            Ok(()) => {
                self.book.write().await.clear_fees_owed(owed);
                tracing::info!(target: "lstbtc::redemption", amount = owed, "Owed fees delivered");
                owed
            }
            Err(e) => {
                tracing::warn!(target: "lstbtc::redemption", amount = owed, error = %e, "Owed fees still undelivered");
                0
            }
        }
    }

    fn authorize(&self, caller: &Address, action: &str) -> VaultResult<()> {
        if self.authority.is_operator(caller) {
            return Ok(());
        }

        log_security_event(
            "operator_check",
            false,
            serde_json::json!({ "caller": caller.as_str(), "action": action }),
            Some(&generate_correlation_id()),
        );
        Err(VaultError::UnauthorizedOperator(caller.to_string()))
    }

    /// Journal failures never roll back engine state
    async fn mirror(&self, record: &TransactionRecord) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record(record).await {
                tracing::warn!(target: "lstbtc::storage", tx_id = %record.id, error = %e, "Journal write failed");
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn snapshot(&self) -> VaultSnapshot {
        self.book.read().await.snapshot()
    }

    pub async fn state(&self) -> VaultState {
        self.book.read().await.state().clone()
    }

    pub async fn current_epoch(&self) -> Epoch {
        self.book.read().await.state().current_epoch
    }

    pub async fn account(&self, user: &Address) -> Option<UserAccount> {
        self.book.read().await.account(user).cloned()
    }

    /// First epoch in which `user` earns yield
    pub async fn eligible_yield_epoch(&self, user: &Address) -> Option<Epoch> {
        self.book
            .read()
            .await
            .account(user)
            .and_then(UserAccount::eligible_yield_epoch)
    }

    pub async fn is_yield_eligible(&self, user: &Address, epoch: Epoch) -> bool {
        self.book
            .read()
            .await
            .account(user)
            .map_or(false, |a| a.is_yield_eligible(epoch))
    }

    /// Liquid units the user can redeem right now
    pub async fn redeemable_now(&self, user: &Address) -> u64 {
        self.book.read().await.account(user).map_or(0, |a| a.balance)
    }

    pub async fn claimable_underlying(&self, user: &Address) -> VaultResult<u64> {
        self.book.read().await.claimable_underlying(user)
    }

    pub async fn pending_redemptions(&self, user: &Address) -> Vec<PendingRedemption> {
        self.book
            .read()
            .await
            .account(user)
            .map(|a| a.pending_redemptions.clone())
            .unwrap_or_default()
    }

    pub async fn transaction(&self, id: &str) -> Option<TransactionRecord> {
        self.book.read().await.transaction(id).cloned()
    }

    /// Every record of `user`, oldest first
    pub async fn transactions_for(&self, user: &Address) -> Vec<TransactionRecord> {
        self.book
            .read()
            .await
            .transactions()
            .iter()
            .filter(|r| &r.user == user)
            .cloned()
            .collect()
    }

    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.book.read().await.transactions().to_vec()
    }

    pub async fn check_supply_invariant(&self) -> VaultResult<()> {
        self.book.read().await.check_supply_invariant()
    }
}
