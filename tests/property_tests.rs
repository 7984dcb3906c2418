//! Property-based tests for the settlement math and queue bookkeeping.
//!
//! These tests verify invariants hold under random inputs.

use levpool_core::math::{burn_amount, mint_amount, price_change_transfer};
use levpool_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

// Strategies for generating test data
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)) // $0.01 to $10,000
}

fn balance_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000i64).prop_map(|x| Decimal::new(x, 3)) // 0 to 1,000,000
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|x| Decimal::new(x, 4)) // 0.0001 to 10,000
}

fn leverage_strategy() -> impl Strategy<Value = Decimal> {
    (1u32..=10u32).prop_map(Decimal::from)
}

#[derive(Debug, Clone)]
enum WindowOp {
    Push,
    Remove(usize),
    Execute(usize),
}

fn window_op_strategy() -> impl Strategy<Value = WindowOp> {
    prop_oneof![
        3 => Just(WindowOp::Push),
        2 => (0..32usize).prop_map(WindowOp::Remove),
        1 => (0..8usize).prop_map(WindowOp::Execute),
    ]
}

proptest! {
    /// A price move only shifts value between the sides.
    #[test]
    fn rebalance_is_zero_sum(
        long in balance_strategy(),
        short in balance_strategy(),
        old in price_strategy(),
        new in price_strategy(),
        leverage in leverage_strategy(),
    ) {
        let rebalance = price_change_transfer(
            long,
            short,
            Price::new_unchecked(old),
            Price::new_unchecked(new),
            Leverage::new(leverage).unwrap(),
        ).unwrap();

        prop_assert_eq!(rebalance.long_balance + rebalance.short_balance, long + short);
        prop_assert!(rebalance.long_balance >= Decimal::ZERO);
        prop_assert!(rebalance.short_balance >= Decimal::ZERO);
    }

    /// The losing side is the one the price moved against, and never pays more than it has.
    #[test]
    fn loser_matches_direction(
        long in balance_strategy(),
        short in balance_strategy(),
        old in price_strategy(),
        new in price_strategy(),
        leverage in leverage_strategy(),
    ) {
        let rebalance = price_change_transfer(
            long,
            short,
            Price::new_unchecked(old),
            Price::new_unchecked(new),
            Leverage::new(leverage).unwrap(),
        ).unwrap();

        match rebalance.losing_side {
            Some(Side::Short) => {
                prop_assert!(new > old);
                prop_assert!(rebalance.transfer <= short);
            }
            Some(Side::Long) => {
                prop_assert!(new < old);
                prop_assert!(rebalance.transfer <= long);
            }
            None => prop_assert_eq!(rebalance.transfer, Decimal::ZERO),
        }
    }

    /// Entering and immediately exiting at the same rate never returns more than was paid.
    #[test]
    fn mint_then_burn_never_profits(
        amount in amount_strategy(),
        balance in amount_strategy(),
        supply in amount_strategy(),
    ) {
        let shares = mint_amount(amount, supply, Decimal::ZERO, balance).unwrap();
        // the new shares are the only pending burn; everyone else's supply stays live
        let payout = burn_amount(shares, balance + amount, supply, shares).unwrap();

        prop_assert!(payout <= amount, "paid {} for {}", payout, amount);
    }

    /// Burns priced off one snapshot can never pay out more than the side holds.
    #[test]
    fn burns_fit_in_balance(
        balance in balance_strategy(),
        exits in proptest::collection::vec(1u32..10_000u32, 1..10),
    ) {
        // every pending exit in the batch; together they are all the claims on the side
        let pending = Decimal::from(exits.iter().sum::<u32>());
        let payouts: Decimal = exits
            .iter()
            .map(|&shares| burn_amount(Decimal::from(shares), balance, Decimal::ZERO, pending).unwrap())
            .sum();

        prop_assert!(payouts <= balance);
    }

    /// The unexecuted window always covers every live id, whatever the order of
    /// commits, withdrawals and partial executions.
    #[test]
    fn window_covers_live_ids(ops in proptest::collection::vec(window_op_strategy(), 1..200)) {
        let mut window = UnexecutedWindow::new();
        let mut live: BTreeSet<CommitId> = BTreeSet::new();
        let mut next = CommitId::FIRST;

        for op in ops {
            match op {
                WindowOp::Push => {
                    window.push(next);
                    live.insert(next);
                    next = next.next();
                }
                WindowOp::Remove(pick) => {
                    let picked = live.iter().nth(pick % live.len().max(1)).copied();
                    if let Some(id) = picked {
                        live.remove(&id);
                        window.remove(id);
                    }
                }
                WindowOp::Execute(count) => {
                    // settle the oldest `count` ids in order, as a batch would
                    let settled: Vec<CommitId> = live.iter().take(count).copied().collect();
                    for id in &settled {
                        live.remove(id);
                    }
                    match live.iter().next() {
                        Some(&head) => window.advance_to(head),
                        None => window.clear(),
                    }
                }
            }

            for id in &live {
                prop_assert!(window.contains(*id), "{} not covered by {:?}", id, window.bounds());
            }
            // a window left holding only withdrawn ids is allowed; a batch walks and clears it
            if let Some((earliest, latest)) = window.bounds() {
                prop_assert!(earliest <= latest);
                prop_assert!(latest < next);
            }
        }
    }

    /// Shadow totals follow adds and removes exactly.
    #[test]
    fn shadow_tracks_live_amounts(
        entries in proptest::collection::vec((0..4usize, amount_strategy()), 1..50),
        removals in proptest::collection::vec(any::<bool>(), 1..50),
    ) {
        let mut shadow = ShadowPools::new();
        let mut live: Vec<(CommitType, Decimal)> = Vec::new();

        for (kind, amount) in &entries {
            shadow.add(CommitType::ALL[*kind], *amount);
            live.push((CommitType::ALL[*kind], *amount));
        }
        for (i, remove) in removals.iter().enumerate() {
            if *remove && i < live.len() {
                let (commit_type, amount) = live[i];
                prop_assert!(shadow.remove(commit_type, amount));
                live[i].1 = Decimal::ZERO;
            }
        }

        for commit_type in CommitType::ALL {
            let expected: Decimal = live
                .iter()
                .filter(|(t, _)| *t == commit_type)
                .map(|(_, a)| *a)
                .sum();
            prop_assert_eq!(shadow.get(commit_type), expected);
        }
    }
}
