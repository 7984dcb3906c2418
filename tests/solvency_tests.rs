//! Solvency invariant tests.
//!
//! Random sequences of commits, withdrawals, waits and upkeeps. After every step the
//! pool must hold exactly what it has booked, and the queue bookkeeping must agree with
//! the live commitments.

use levpool_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const POOL: AccountId = AccountId(100);
const KEEPER: AccountId = AccountId(102);
const USERS: [AccountId; 4] = [AccountId(1), AccountId(2), AccountId(3), AccountId(4)];
const FUNDING: Decimal = dec!(1_000_000);

#[derive(Debug, Clone)]
enum Op {
    Commit { user: usize, kind: usize, cents: i64 },
    Uncommit { pick: usize },
    Wait { secs: i64 },
    Upkeep { move_bp: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..USERS.len(), 0..4usize, 1i64..5_000_000i64)
            .prop_map(|(user, kind, cents)| Op::Commit { user, kind, cents }),
        1 => (0..64usize).prop_map(|pick| Op::Uncommit { pick }),
        1 => (1i64..4_000i64).prop_map(|secs| Op::Wait { secs }),
        2 => (-2_000i64..=2_000i64).prop_map(|move_bp| Op::Upkeep { move_bp }),
    ]
}

fn config_strategy() -> impl Strategy<Value = PoolConfig> {
    (1u32..=5u32, 0i64..=50i64, 0i64..=5i64).prop_map(|(leverage, fee_bp, reward)| PoolConfig {
        leverage: Decimal::from(leverage),
        fee_rate: Decimal::new(fee_bp, 4),
        keeper_reward: Decimal::from(reward),
        ..PoolConfig::default()
    })
}

fn deploy(config: PoolConfig) -> SettlementEngine {
    let mut settlement = TokenLedger::new("USDC");
    for user in USERS {
        settlement.mint(FUNDING, user).unwrap();
    }
    let roles = PoolRoles {
        pool: POOL,
        committer: AccountId(101),
        keeper: KEEPER,
        governance: AccountId(103),
        fee_address: AccountId(104),
    };
    let mut engine = SettlementEngine::with_settlement(
        EngineConfig::default(),
        PoolId(1),
        config,
        roles,
        settlement,
        Timestamp::from_secs(0),
    )
    .unwrap();
    for user in USERS {
        engine.approve_settlement(user, FUNDING).unwrap();
    }
    engine
}

fn apply(engine: &mut SettlementEngine, price: &mut Decimal, op: &Op) {
    match *op {
        Op::Commit { user, kind, cents } => {
            // exits without enough shares fail; that is part of the test
            let _ = engine.commit(USERS[user], CommitType::ALL[kind], Decimal::new(cents, 2));
        }
        Op::Uncommit { pick } => {
            let pending: Vec<(CommitId, AccountId)> =
                engine.pending_commitments().map(|c| (c.id, c.owner)).collect();
            if let Some(&(id, owner)) = pending.get(pick % pending.len().max(1)) {
                engine.uncommit(owner, id).unwrap();
            }
        }
        Op::Wait { secs } => engine.advance_time(secs),
        Op::Upkeep { move_bp } => {
            if engine.time() < engine.next_upkeep_at() {
                engine.set_time(engine.next_upkeep_at());
            }
            let new_price = *price * (Decimal::ONE + Decimal::new(move_bp, 4));
            engine.upkeep(KEEPER, *price, new_price).unwrap();
            *price = new_price;
        }
    }
}

fn check_invariants(engine: &SettlementEngine) -> Result<(), TestCaseError> {
    let settlement = &engine.tokens().settlement;
    let shadow = engine.shadow();

    prop_assert!(engine.long_balance() >= Decimal::ZERO);
    prop_assert!(engine.short_balance() >= Decimal::ZERO);

    // escrow held == booked balances + pending entry deposits
    let booked = engine.long_balance()
        + engine.short_balance()
        + shadow.pending_mint(Side::Long)
        + shadow.pending_mint(Side::Short);
    prop_assert_eq!(settlement.balance_of(POOL), booked);

    // settlement asset is only ever moved, never created or destroyed
    prop_assert_eq!(settlement.total_supply(), FUNDING * Decimal::from(USERS.len()));

    for commit_type in CommitType::ALL {
        let live: Decimal = engine
            .pending_commitments()
            .filter(|c| c.commit_type == commit_type)
            .map(|c| c.amount)
            .sum();
        prop_assert_eq!(shadow.get(commit_type), live);
    }

    let window = engine.committer().window();
    for commitment in engine.pending_commitments() {
        prop_assert!(window.contains(commitment.id), "{} outside window", commitment.id);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every step keeps the pool fully backed and the queue consistent.
    #[test]
    fn escrow_always_matches_books(
        config in config_strategy(),
        ops in proptest::collection::vec(op_strategy(), 1..60),
    ) {
        let mut engine = deploy(config);
        let mut price = dec!(2000);

        for op in &ops {
            apply(&mut engine, &mut price, op);
            check_invariants(&engine)?;
        }
    }

    /// An upkeep settles everything older than the front-running cutoff and nothing newer.
    #[test]
    fn upkeep_clears_everything_past_cutoff(
        ops in proptest::collection::vec(op_strategy(), 1..40),
    ) {
        let mut engine = deploy(PoolConfig::default());
        let mut price = dec!(2000);
        for op in &ops {
            apply(&mut engine, &mut price, op);
        }

        engine.set_time(engine.next_upkeep_at().max(engine.time()));
        let cutoff = engine.time().as_secs() - engine.pool_config().front_running_interval_secs;
        let result = engine.upkeep(KEEPER, price, price).unwrap();

        for commitment in engine.pending_commitments() {
            prop_assert!(commitment.created_at.as_secs() >= cutoff);
        }
        prop_assert!(result.batch.deferred_from.is_some() || engine.committer().pending_count() == 0);
        check_invariants(&engine)?;
    }

    /// Withdrawing returns exactly what was escrowed, whatever the amount.
    #[test]
    fn uncommit_refunds_exactly(
        cents in 1i64..100_000_000i64,
        kind in 0..2usize,
    ) {
        let mut engine = deploy(PoolConfig::default());
        let user = USERS[0];
        let commit_type = [CommitType::EnterLong, CommitType::EnterShort][kind];
        let amount = Decimal::new(cents, 2);

        let id = engine.commit(user, commit_type, amount).unwrap();
        prop_assert_eq!(engine.tokens().settlement.balance_of(user), FUNDING - amount);

        let removed = engine.uncommit(user, id).unwrap();
        prop_assert_eq!(removed.amount, amount);
        prop_assert_eq!(engine.tokens().settlement.balance_of(user), FUNDING);
        prop_assert_eq!(engine.tokens().settlement.balance_of(POOL), Decimal::ZERO);
    }
}
