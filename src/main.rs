//! lstBTC Operator CLI
//!
//! Runs the epoch demo scenario, a simulated keeper against the in-memory
//! ledger, or prints the loaded configuration.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use lstbtc::common::{init_from_config, AppError, Result};
use lstbtc::types::{format_units, parse_units};
use lstbtc::{
    Address, Asset, AssetAmount, AssetLedger, EpochKeeper, EpochVaultEngine, InMemoryLedger,
    KeeperConfig, MemoryJournal, SqliteJournal, TransactionJournal, VaultConfig, VaultError,
};

#[derive(Parser)]
#[command(name = "lstbtc")]
#[command(about = "Epoch vault accounting engine for lstBTC")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through deposit, yield, redemption and emergency redemption
    /// (requires LSTBTC_DEMO_MODE=1)
    Demo,

    /// Run the keeper against an in-memory ledger
    Keeper {
        /// Number of epochs to advance
        #[arg(short, long, default_value = "3")]
        epochs: u64,

        /// Seconds between epochs (defaults to LSTBTC_EPOCH_INTERVAL_SECS)
        #[arg(short, long)]
        interval_secs: Option<u64>,

        /// Yield per epoch in bps (defaults to LSTBTC_YIELD_BPS_PER_EPOCH)
        #[arg(short, long)]
        yield_bps: Option<u16>,

        /// wBTC seeded into the vault before the first epoch
        #[arg(short, long, default_value = "1.0")]
        deposit: String,
    },

    /// Print the loaded configuration
    Config,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error [{}]: {}", e.error_code(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = VaultConfig::from_env()?;

    match cli.command {
        Commands::Config => {
            config.print_summary();
            if let Err(e) = config.validate_for_production() {
                println!("Production check: {}", e);
            } else {
                println!("Production check: ok");
            }
            Ok(())
        }
        Commands::Demo => {
            init_from_config(&config)?;
            run_demo(&config).await
        }
        Commands::Keeper {
            epochs,
            interval_secs,
            yield_bps,
            deposit,
        } => {
            init_from_config(&config)?;
            run_keeper(&config, epochs, interval_secs, yield_bps, &deposit).await
        }
    }
}

fn open_journal(config: &VaultConfig) -> Result<Arc<dyn TransactionJournal>> {
    let journal: Arc<dyn TransactionJournal> = match &config.journal_path {
        Some(path) => Arc::new(SqliteJournal::new(path)?),
        None => Arc::new(MemoryJournal::new()),
    };
    Ok(journal)
}

fn build_engine(config: &VaultConfig, ledger: &InMemoryLedger) -> Result<Arc<EpochVaultEngine>> {
    let engine = EpochVaultEngine::new(
        config.engine_config(),
        Arc::new(ledger.clone()),
        Arc::new(config.operator_set()),
    )
    .with_journal(open_journal(config)?);

    Ok(Arc::new(engine))
}

fn tokens(raw: &str) -> Result<u64> {
    parse_units(raw).ok_or_else(|| {
        AppError::from(VaultError::InvalidAmount(format!(
            "not a token amount: {}",
            raw
        )))
    })
}

fn first_operator(config: &VaultConfig) -> Result<Address> {
    config
        .operators
        .first()
        .cloned()
        .ok_or_else(|| AppError::internal("no operator configured"))
}

/// Deposit through the engine and credit the vault account with the asset,
/// standing in for the on-chain transfer the engine mirrors.
async fn simulate_deposit(
    engine: &EpochVaultEngine,
    ledger: &InMemoryLedger,
    user: &Address,
    amount: u64,
) -> Result<u64> {
    let record = engine
        .deposit(user, &[AssetAmount::new(Asset::WBtc, amount)])
        .await?;
    ledger
        .mint(&engine.config().vault_address, Asset::WBtc, amount)
        .await;
    Ok(record.liquid_amount)
}

async fn run_demo(config: &VaultConfig) -> Result<()> {
    config.ensure_demo_allowed()?;

    let ledger = InMemoryLedger::new();
    let engine = build_engine(config, &ledger)?;
    let operator = first_operator(config)?;
    let alice = Address::from_bytes([0xa1; 20]);
    let bob = Address::from_bytes([0xb0; 20]);
    let one = tokens("1.0")?;

    println!("=== lstBTC Epoch Demo ===");
    println!("{}", engine.snapshot().await);

    let minted = simulate_deposit(&engine, &ledger, &alice, one).await?;
    println!("alice deposits 1.0 wBTC -> {} lstBTC", format_units(minted));

    let yield_amount = tokens("0.02")?;
    ledger.mint(&config.treasury, Asset::WBtc, yield_amount).await;
    ledger
        .transfer(&config.treasury, &config.vault_address, Asset::WBtc, yield_amount)
        .await?;
    engine.inject_yield(&operator, yield_amount).await?;
    println!(
        "operator injects 0.02 wBTC -> rate {}",
        engine.state().await.exchange_rate
    );

    let minted = simulate_deposit(&engine, &ledger, &bob, one).await?;
    println!("bob deposits 1.0 wBTC -> {} lstBTC", format_units(minted));

    engine.redeem(&alice, one).await?;
    println!("alice queues 1.0 lstBTC for redemption");

    let record = engine.emergency_redeem(&bob, minted, None).await?;
    println!(
        "bob emergency-redeems {} lstBTC -> {} wBTC now (fee {} lstBTC)",
        format_units(minted),
        format_units(record.underlying_amount),
        format_units(record.fee_amount)
    );

    let report = engine.advance_epoch(&operator).await?;
    println!("{}", report);

    for (name, who) in [("alice", &alice), ("bob", &bob)] {
        println!(
            "{:<6} wallet {} wBTC | lstBTC {}",
            name,
            format_units(ledger.balance_of(who, Asset::WBtc).await),
            format_units(engine.redeemable_now(who).await)
        );
    }
    println!(
        "fees   {} wBTC",
        format_units(ledger.balance_of(&config.fee_receiver, Asset::WBtc).await)
    );
    println!("{}", engine.snapshot().await);

    engine.check_supply_invariant().await?;
    Ok(())
}

async fn run_keeper(
    config: &VaultConfig,
    epochs: u64,
    interval_secs: Option<u64>,
    yield_bps: Option<u16>,
    deposit: &str,
) -> Result<()> {
    let ledger = InMemoryLedger::new();
    let engine = build_engine(config, &ledger)?;

    let seed = tokens(deposit)?;
    if seed > 0 {
        simulate_deposit(&engine, &ledger, &Address::from_bytes([0xa1; 20]), seed).await?;
    }
    ledger
        .mint(&config.treasury, Asset::WBtc, seed.saturating_mul(10))
        .await;

    let mut keeper_config = KeeperConfig::from_vault_config(config)?.with_max_epochs(epochs);
    if let Some(secs) = interval_secs {
        keeper_config = keeper_config.with_interval(Duration::from_secs(secs));
    }
    if let Some(bps) = yield_bps {
        keeper_config.yield_bps_per_epoch = bps;
    }

    let keeper = EpochKeeper::new(keeper_config, engine.clone());
    keeper.run().await?;

    println!("{}", engine.snapshot().await);
    Ok(())
}
