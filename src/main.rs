//! Leveraged Pool Settlement Simulation.
//!
//! Walks one pool through commits, upkeeps, price moves, front-running deferral,
//! failed executions and a keeper driving an averaged oracle.
//!
//! Usage: `levpool-sim [pool-config.json]`. Log level via `RUST_LOG`.

use levpool_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::error::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const POOL: AccountId = AccountId(1_000);
const COMMITTER: AccountId = AccountId(1_001);
const KEEPER: AccountId = AccountId(1_002);
const GOVERNANCE: AccountId = AccountId(1_003);
const TREASURY: AccountId = AccountId(1_004);

const ALICE: AccountId = AccountId(1);
const BOB: AccountId = AccountId(2);
const CAROL: AccountId = AccountId(3);

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "levpool_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool_config = match std::env::args().nth(1) {
        Some(path) => PoolConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => PoolConfig::default(),
    };

    println!("Leveraged Pool Settlement Simulation");
    println!(
        "{} at {}x, update every {}s, front-running window {}s\n",
        pool_config.name,
        pool_config.leverage,
        pool_config.update_interval_secs,
        pool_config.front_running_interval_secs
    );

    scenario_1_commit_and_settle(&pool_config)?;
    scenario_2_front_running_deferral(&pool_config)?;
    scenario_3_uncommit(&pool_config)?;
    scenario_4_failed_execution(&pool_config)?;
    scenario_5_keeper_with_sma_oracle(&pool_config)?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn roles() -> PoolRoles {
    PoolRoles {
        pool: POOL,
        committer: COMMITTER,
        keeper: KEEPER,
        governance: GOVERNANCE,
        fee_address: TREASURY,
    }
}

// fresh pool with each user funded and approved for 10,000 USDC
fn deploy(pool_config: &PoolConfig, users: &[AccountId]) -> Result<SettlementEngine, Box<dyn Error>> {
    let mut settlement = TokenLedger::new(&pool_config.settlement_symbol);
    for &user in users {
        settlement.mint(dec!(10_000), user)?;
    }

    let mut engine = SettlementEngine::with_settlement(
        EngineConfig::default(),
        PoolId(1),
        pool_config.clone(),
        roles(),
        settlement,
        Timestamp::now(),
    )?;
    for &user in users {
        engine.approve_settlement(user, dec!(10_000))?;
    }
    Ok(engine)
}

fn print_pool(engine: &SettlementEngine) {
    println!(
        "    long {} ({} shares), short {} ({} shares)",
        engine.long_balance().round_dp(4),
        engine.tokens().long.total_supply().round_dp(4),
        engine.short_balance().round_dp(4),
        engine.tokens().short.total_supply().round_dp(4),
    );
}

/// Both sides enter, the price moves, the long side exits at a profit.
fn scenario_1_commit_and_settle(pool_config: &PoolConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 1: Commit, Rebalance, Settle\n");

    let mut engine = deploy(pool_config, &[ALICE, BOB])?;
    let interval = engine.pool_config().update_interval_secs;

    engine.commit(ALICE, CommitType::EnterLong, dec!(1_000))?;
    engine.commit(BOB, CommitType::EnterShort, dec!(1_000))?;
    println!("  Alice commits 1,000 long, Bob commits 1,000 short");

    engine.advance_time(interval);
    let result = engine.upkeep(KEEPER, dec!(2_000), dec!(2_000))?;
    println!("  Upkeep at flat price settles {} commitments", result.executed());
    print_pool(&engine);

    engine.advance_time(interval);
    engine.upkeep(KEEPER, dec!(2_000), dec!(2_100))?;
    println!("  Price rises 5%");
    print_pool(&engine);

    let shares = engine.tokens().long.balance_of(ALICE);
    engine.commit(ALICE, CommitType::ExitLong, shares)?;
    engine.advance_time(interval);
    engine.upkeep(KEEPER, dec!(2_100), dec!(2_100))?;

    let usdc = engine.tokens().settlement.balance_of(ALICE);
    println!("  Alice exits with {} USDC", usdc.round_dp(4));
    println!("  Treasury collected {} USDC in fees\n", engine.tokens().settlement.balance_of(TREASURY).round_dp(6));
    Ok(())
}

/// A commitment made inside the front-running window waits one more interval.
fn scenario_2_front_running_deferral(pool_config: &PoolConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 2: Front-Running Deferral\n");

    let mut engine = deploy(pool_config, &[ALICE, BOB])?;
    let interval = engine.pool_config().update_interval_secs;
    let window = engine.pool_config().front_running_interval_secs;

    engine.commit(ALICE, CommitType::EnterLong, dec!(500))?;
    engine.advance_time(interval - window);
    let late = engine.commit(BOB, CommitType::EnterLong, dec!(500))?;
    println!("  Bob commits {}s before the next price", window);

    engine.set_time(engine.next_upkeep_at());
    let result = engine.upkeep(KEEPER, dec!(2_000), dec!(2_000))?;
    println!(
        "  Upkeep executes {}, defers from {:?}",
        result.executed(),
        result.batch.deferred_from.map(|id| id.to_string())
    );
    println!("  Bob's commitment still queued: {}", engine.get_commit(late).is_some());

    engine.advance_time(interval);
    let result = engine.upkeep(KEEPER, dec!(2_000), dec!(2_000))?;
    println!("  Next upkeep executes {}\n", result.executed());
    Ok(())
}

/// Withdrawal returns the exact escrow; strangers cannot withdraw.
fn scenario_3_uncommit(pool_config: &PoolConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 3: Uncommit\n");

    let mut engine = deploy(pool_config, &[ALICE, BOB])?;

    let id = engine.commit(ALICE, CommitType::EnterShort, dec!(1_234.5678))?;
    match engine.uncommit(BOB, id) {
        Err(err) => println!("  Bob tries to withdraw Alice's commitment: {}", err),
        Ok(_) => return Err("stranger withdrew a commitment".into()),
    }

    engine.uncommit(ALICE, id)?;
    println!(
        "  Alice withdraws, balance back to {} USDC",
        engine.tokens().settlement.balance_of(ALICE)
    );
    println!("  Pending enter-short: {}\n", engine.shadow().get(CommitType::EnterShort));
    Ok(())
}

/// A commitment whose mint reverts is refunded; the rest of the batch settles.
fn scenario_4_failed_execution(pool_config: &PoolConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 4: Failed Execution Refund\n");

    let mut engine = deploy(pool_config, &[ALICE, BOB])?;
    let interval = engine.pool_config().update_interval_secs;

    engine.commit(ALICE, CommitType::EnterLong, dec!(700))?;
    engine.commit(BOB, CommitType::EnterShort, dec!(300))?;
    engine.set_token_paused(PoolToken::Share(Side::Long), TokenOperation::Mint, true);
    println!("  Long share token minting paused");

    engine.advance_time(interval);
    let result = engine.upkeep(KEEPER, dec!(2_000), dec!(2_000))?;
    println!("  Executed {}, failed and refunded {}", result.executed(), result.failed());
    println!("  Alice holds {} USDC again", engine.tokens().settlement.balance_of(ALICE));
    print_pool(&engine);
    println!();
    Ok(())
}

/// Keeper settles against a 3-period moving average of a noisy feed.
fn scenario_5_keeper_with_sma_oracle(pool_config: &PoolConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 5: Keeper with Averaged Oracle\n");

    let mut engine = deploy(pool_config, &[ALICE, BOB, CAROL])?;
    let interval = engine.pool_config().update_interval_secs;

    let mut source = MockPriceSource::new(&pool_config.name, 8);
    source.set_price(dec!(2_000), engine.time());
    let mut oracle = SmaOracle::new(OracleWrapper::new(source)?, 3)?;

    let mut keeper = PoolKeeper::new(KEEPER);
    keeper.register_pool(engine.pool_id(), &mut oracle)?;

    engine.commit(ALICE, CommitType::EnterLong, dec!(2_000))?;
    engine.commit(BOB, CommitType::EnterShort, dec!(2_000))?;

    let feed = [dec!(2_050), dec!(1_980), dec!(2_120), dec!(2_200), dec!(2_150)];
    for (round, price) in feed.into_iter().enumerate() {
        engine.advance_time(interval);
        oracle.inner_mut().source_mut().set_price(price, engine.time());

        if round == 2 {
            engine.commit(CAROL, CommitType::EnterLong, dec!(1_000))?;
        }
        if !keeper.check_upkeep(&engine) {
            continue;
        }
        keeper.perform_upkeep(&mut engine, &mut oracle)?;
        println!(
            "  Round {}: spot {}, settled at {}",
            round + 1,
            price,
            keeper.execution_price(engine.pool_id()).unwrap_or(Decimal::ZERO).round_dp(2)
        );
        print_pool(&engine);
    }

    let events = engine.events().len();
    println!("  {} events recorded", events);
    Ok(())
}
