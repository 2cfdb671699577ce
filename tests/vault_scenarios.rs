//! End-to-end vault scenarios against the in-memory ledger

use std::sync::Arc;

use lstbtc::{
    Address, Asset, AssetAmount, EngineConfig, Epoch, EpochVaultEngine, ExchangeRate,
    InMemoryLedger, SqliteJournal, StaticOperators, TransactionJournal, TransactionKind,
    TransactionStatus, VaultError, YieldOutcome, UNITS_PER_TOKEN,
};

const ONE: u64 = UNITS_PER_TOKEN;

fn addr(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

fn vault() -> Address {
    addr(0xee)
}

fn fee_receiver() -> Address {
    addr(0xfe)
}

fn operator() -> Address {
    addr(0x0a)
}

struct Harness {
    engine: Arc<EpochVaultEngine>,
    ledger: InMemoryLedger,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(EngineConfig::new(vault(), fee_receiver()))
    }

    fn with_config(config: EngineConfig) -> Self {
        let ledger = InMemoryLedger::new();
        let engine = EpochVaultEngine::new(
            config,
            Arc::new(ledger.clone()),
            Arc::new(StaticOperators::new([operator()])),
        );
        Self {
            engine: Arc::new(engine),
            ledger,
        }
    }

    /// Deposit wBTC and credit the vault account as the chain would
    async fn deposit(&self, user: &Address, amount: u64) -> u64 {
        let record = self
            .engine
            .deposit(user, &[AssetAmount::new(Asset::WBtc, amount)])
            .await
            .unwrap();
        self.ledger.mint(&vault(), Asset::WBtc, amount).await;
        record.liquid_amount
    }

    async fn inject(&self, amount: u64) -> YieldOutcome {
        self.ledger.mint(&vault(), Asset::WBtc, amount).await;
        self.engine.inject_yield(&operator(), amount).await.unwrap()
    }

    async fn wallet(&self, user: &Address) -> u64 {
        self.ledger.balance_of(user, Asset::WBtc).await
    }
}

#[tokio::test]
async fn yield_then_redeem_pays_out_at_new_rate() {
    let h = Harness::new();
    let user = addr(1);

    assert_eq!(h.deposit(&user, ONE).await, ONE);
    h.inject(2_000_000).await;
    assert_eq!(h.engine.state().await.exchange_rate.to_string(), "1.02");

    h.engine.redeem(&user, ONE).await.unwrap();
    let report = h.engine.advance_epoch(&operator()).await.unwrap();

    assert_eq!(report.settled, 1);
    assert_eq!(report.paid_out, 102_000_000);
    assert_eq!(h.wallet(&user).await, 102_000_000);

    let state = h.engine.state().await;
    assert_eq!(state.total_supply, 0);
    assert_eq!(state.total_underlying_held, 0);
    h.engine.check_supply_invariant().await.unwrap();
}

#[tokio::test]
async fn pending_redemption_earns_yield_until_settled() {
    let h = Harness::new();
    let user = addr(1);
    h.deposit(&user, ONE).await;

    h.engine.redeem(&user, ONE).await.unwrap();
    h.inject(2_000_000).await;
    h.engine.advance_epoch(&operator()).await.unwrap();

    assert_eq!(h.wallet(&user).await, 102_000_000);
}

#[tokio::test]
async fn emergency_redeem_pays_immediately_minus_fee() {
    let h = Harness::new();
    let user = addr(1);
    h.deposit(&user, ONE).await;

    let record = h.engine.emergency_redeem(&user, ONE, Some(100)).await.unwrap();

    assert_eq!(record.kind, TransactionKind::EmergencyRedeem);
    assert_eq!(record.status, TransactionStatus::Settled);
    assert_eq!(record.fee_amount, ONE / 100);
    assert_eq!(h.wallet(&user).await, 99_000_000);
    assert_eq!(h.wallet(&fee_receiver()).await, 1_000_000);
    assert_eq!(h.engine.state().await.total_supply, 0);
    assert_eq!(h.engine.current_epoch().await, Epoch(0));
}

#[tokio::test]
async fn emergency_redeem_uses_configured_default_fee() {
    let h = Harness::with_config(
        EngineConfig::new(vault(), fee_receiver()).with_emergency_fee_bps(250),
    );
    let user = addr(1);
    h.deposit(&user, ONE).await;

    h.engine.emergency_redeem(&user, ONE, None).await.unwrap();

    assert_eq!(h.wallet(&user).await, 97_500_000);
    assert_eq!(h.wallet(&fee_receiver()).await, 2_500_000);
}

#[tokio::test]
async fn yield_without_supply_is_a_no_op() {
    let h = Harness::new();

    let outcome = h.engine.inject_yield(&operator(), ONE).await.unwrap();

    assert_eq!(outcome, YieldOutcome::Skipped);
    assert_eq!(h.engine.state().await.exchange_rate, ExchangeRate::ONE);
    assert!(h.engine.transactions().await.is_empty());
}

#[tokio::test]
async fn advance_with_nothing_due_only_moves_epoch() {
    let h = Harness::new();
    h.deposit(&addr(1), ONE).await;
    let before = h.engine.state().await;

    let report = h.engine.advance_epoch(&operator()).await.unwrap();
    let after = h.engine.state().await;

    assert!(!report.has_activity());
    assert_eq!(after.current_epoch, before.current_epoch.next());
    assert_eq!(after.total_supply, before.total_supply);
    assert_eq!(after.exchange_rate, before.exchange_rate);
    assert_eq!(after.total_underlying_held, before.total_underlying_held);
    assert_eq!(h.engine.transactions().await.len(), 1);
}

#[tokio::test]
async fn redemption_settles_only_at_next_boundary() {
    let h = Harness::new();
    let user = addr(1);
    h.deposit(&user, 2 * ONE).await;
    h.engine.advance_epoch(&operator()).await.unwrap();

    let record = h.engine.redeem(&user, ONE).await.unwrap();
    assert_eq!(record.request_epoch, Epoch(1));
    assert_eq!(h.wallet(&user).await, 0);

    h.engine.advance_epoch(&operator()).await.unwrap();
    let settled = h.engine.transaction(&record.id).await.unwrap();
    assert_eq!(settled.status, TransactionStatus::Settled);
    assert_eq!(settled.settlement_epoch, Some(Epoch(2)));
    assert!(h.engine.pending_redemptions(&user).await.is_empty());
    assert_eq!(h.engine.redeemable_now(&user).await, ONE);
}

#[tokio::test]
async fn round_trip_never_returns_more_than_deposited() {
    let h = Harness::new();
    h.deposit(&addr(1), ONE).await;
    h.inject(3_000_000).await;

    let user = addr(2);
    let deposited = 70_000_000;
    let minted = h.deposit(&user, deposited).await;
    assert_eq!(minted, 67_961_165);

    h.engine.redeem(&user, minted).await.unwrap();
    h.engine.advance_epoch(&operator()).await.unwrap();

    let paid = h.wallet(&user).await;
    assert!(paid <= deposited);
    assert!(deposited - paid <= 2);
    assert!(h.engine.state().await.exchange_rate >= "1.03".parse::<ExchangeRate>().unwrap());
}

#[tokio::test]
async fn same_epoch_depositor_can_redeem_at_once() {
    let h = Harness::new();
    let user = addr(1);
    h.engine.advance_epoch_to(&operator(), Epoch(5)).await.unwrap();

    h.deposit(&user, ONE).await;

    assert!(h.engine.redeemable_now(&user).await > 0);
    assert_eq!(h.engine.eligible_yield_epoch(&user).await, Some(Epoch(6)));
    assert!(!h.engine.is_yield_eligible(&user, Epoch(5)).await);
    h.engine.redeem(&user, ONE).await.unwrap();
}

#[tokio::test]
async fn rejected_operations_leave_state_untouched() {
    let h = Harness::new();
    let user = addr(1);
    h.deposit(&user, ONE).await;
    let before = h.engine.state().await;
    let log_len = h.engine.transactions().await.len();

    let stcore = [AssetAmount::new(Asset::StCore, ONE)];
    assert!(matches!(
        h.engine.deposit(&user, &stcore).await,
        Err(VaultError::UnsupportedAsset(_))
    ));
    assert!(matches!(
        h.engine.redeem(&user, 2 * ONE).await,
        Err(VaultError::InsufficientBalance { .. })
    ));
    assert_eq!(
        h.engine.emergency_redeem(&user, ONE, Some(10_001)).await,
        Err(VaultError::InvalidFeeRate(10_001))
    );
    assert_eq!(h.engine.inject_yield(&operator(), 0).await, Err(VaultError::ZeroAmount));
    assert!(matches!(
        h.engine.advance_epoch(&user).await,
        Err(VaultError::UnauthorizedOperator(_))
    ));

    assert_eq!(h.engine.state().await, before);
    assert_eq!(h.engine.transactions().await.len(), log_len);
}

#[tokio::test]
async fn stcore_deposits_are_priced_in_underlying() {
    let config = EngineConfig::new(vault(), fee_receiver())
        .with_asset(Asset::StCore, "0.25".parse().unwrap());
    let h = Harness::with_config(config);

    let record = h
        .engine
        .deposit(
            &addr(1),
            &[
                AssetAmount::new(Asset::WBtc, ONE / 2),
                AssetAmount::new(Asset::StCore, 2 * ONE),
            ],
        )
        .await
        .unwrap();

    assert_eq!(record.underlying_amount, ONE);
    assert_eq!(record.liquid_amount, ONE);
    assert_eq!(h.engine.claimable_underlying(&addr(1)).await.unwrap(), ONE);
}

#[tokio::test]
async fn settlement_retries_after_ledger_outage() {
    let h = Harness::new();
    let user = addr(1);
    h.deposit(&user, ONE).await;
    let record = h.engine.redeem(&user, ONE).await.unwrap();

    h.ledger.simulate_outage("node syncing").await;
    let first = h.engine.advance_epoch(&operator()).await.unwrap();
    assert_eq!(first.deferred, 1);
    assert_eq!(h.engine.pending_redemptions(&user).await[0].attempts, 1);
    assert!(h.engine.transaction(&record.id).await.unwrap().is_pending());
    h.engine.check_supply_invariant().await.unwrap();

    h.ledger.resume().await;
    let second = h.engine.advance_epoch(&operator()).await.unwrap();
    assert_eq!(second.settled, 1);
    assert_eq!(h.wallet(&user).await, ONE);

    // Nothing left to settle twice
    let third = h.engine.advance_epoch(&operator()).await.unwrap();
    assert!(!third.has_activity());
    assert_eq!(h.wallet(&user).await, ONE);
}

#[tokio::test]
async fn supply_is_conserved_across_mixed_activity() {
    let h = Harness::new();
    let users: Vec<Address> = (1..=4).map(addr).collect();

    for (i, user) in users.iter().enumerate() {
        h.deposit(user, (i as u64 + 1) * ONE).await;
        h.engine.check_supply_invariant().await.unwrap();
    }

    h.inject(5_000_000).await;
    h.engine.redeem(&users[0], ONE / 2).await.unwrap();
    h.engine.check_supply_invariant().await.unwrap();
    h.engine.emergency_redeem(&users[1], ONE, None).await.unwrap();
    h.engine.check_supply_invariant().await.unwrap();
    h.engine.redeem(&users[2], 3 * ONE).await.unwrap();
    h.engine.advance_epoch(&operator()).await.unwrap();
    h.engine.check_supply_invariant().await.unwrap();
    h.inject(1_000_000).await;
    h.engine.redeem(&users[3], ONE).await.unwrap();
    h.engine.advance_epoch(&operator()).await.unwrap();
    h.engine.check_supply_invariant().await.unwrap();

    let snapshot = h.engine.snapshot().await;
    assert_eq!(snapshot.pending_redemptions, 0);
    assert_eq!(snapshot.state.total_supply, ONE / 2 + ONE + 3 * ONE);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_are_serialized() {
    let h = Harness::new();
    let engine = h.engine.clone();

    let mut tasks = Vec::new();
    for byte in 1..=20u8 {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move {
            let user = addr(byte);
            engine
                .deposit(&user, &[AssetAmount::new(Asset::WBtc, ONE)])
                .await
                .unwrap();
            engine.redeem(&user, ONE / 2).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    h.ledger.mint(&vault(), Asset::WBtc, 20 * ONE).await;

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.state.total_supply, 20 * ONE);
    assert_eq!(snapshot.pending_redemptions, 20);
    assert_eq!(snapshot.transactions, 40);
    engine.check_supply_invariant().await.unwrap();

    let op = operator();
    let (a, b) = tokio::join!(
        engine.advance_epoch_to(&op, Epoch(1)),
        engine.advance_epoch_to(&op, Epoch(1)),
    );
    let settled: usize = a.unwrap().iter().chain(b.unwrap().iter()).map(|r| r.settled).sum();

    assert_eq!(settled, 20);
    assert_eq!(engine.current_epoch().await, Epoch(1));
    assert_eq!(engine.state().await.total_supply, 10 * ONE);
}

#[tokio::test]
async fn journal_mirrors_the_transaction_log() {
    let dir = tempfile::tempdir().unwrap();
    let journal = Arc::new(SqliteJournal::new(dir.path().join("journal.db")).unwrap());

    let ledger = InMemoryLedger::new();
    let engine = EpochVaultEngine::new(
        EngineConfig::new(vault(), fee_receiver()),
        Arc::new(ledger.clone()),
        Arc::new(StaticOperators::new([operator()])),
    )
    .with_journal(journal.clone());

    let user = addr(1);
    engine
        .deposit(&user, &[AssetAmount::new(Asset::WBtc, ONE)])
        .await
        .unwrap();
    ledger.mint(&vault(), Asset::WBtc, ONE).await;
    let redeem = engine.redeem(&user, ONE).await.unwrap();

    assert_eq!(journal.by_status(TransactionStatus::Pending).await.unwrap().len(), 1);

    engine.advance_epoch(&operator()).await.unwrap();

    assert_eq!(journal.count().await.unwrap(), 2);
    assert!(journal.by_status(TransactionStatus::Pending).await.unwrap().is_empty());
    let stored = journal.get(&redeem.id).await.unwrap().unwrap();
    assert_eq!(Some(stored), engine.transaction(&redeem.id).await);
    assert_eq!(journal.by_user(&user).await.unwrap(), engine.transactions_for(&user).await);
}
