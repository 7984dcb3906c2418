// 2.0: fixed-point math. pure functions, no state.
// every derived amount is truncated toward zero at AMOUNT_SCALE places, so rounding
// always favours the pool over the individual user and never creates value.
// functions return None on division by zero or overflow; callers decide what that means.

use crate::types::{Leverage, Price, Side};
use rust_decimal::{Decimal, RoundingStrategy};

pub const AMOUNT_SCALE: u32 = 18;

pub fn truncate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::ToZero)
}

pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator).map(truncate)
}

pub fn scale(amount: Decimal, factor: Decimal) -> Option<Decimal> {
    amount.checked_mul(factor).map(truncate)
}

// a * b / c with a single truncation at the end
pub fn mul_div(a: Decimal, b: Decimal, c: Decimal) -> Option<Decimal> {
    if c.is_zero() {
        return None;
    }
    a.checked_mul(b)?.checked_div(c).map(truncate)
}

// 2.1: per-side fee for one update interval. fee_rate is a fraction of balance.
pub fn fee_split(long_balance: Decimal, short_balance: Decimal, fee_rate: Decimal) -> Option<(Decimal, Decimal)> {
    Some((scale(long_balance, fee_rate)?, scale(short_balance, fee_rate)?))
}

// 2.2: share of the losing side's balance that moves for a given price ratio.
// 10% move at 2x → 20%. capped at the whole side.
pub fn loss_multiplier(price_ratio: Decimal, leverage: Leverage) -> Option<Decimal> {
    let move_size = (price_ratio - Decimal::ONE).abs();
    Some(scale(move_size, leverage.value())?.min(Decimal::ONE))
}

/// Balances after a price move, plus which side paid and how much.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rebalance {
    pub long_balance: Decimal,
    pub short_balance: Decimal,
    pub losing_side: Option<Side>,
    pub transfer: Decimal,
}

/// 2.3: zero-sum transfer between the two sides for a move from `old` to `new`.
pub fn price_change_transfer(
    long_balance: Decimal,
    short_balance: Decimal,
    old: Price,
    new: Price,
    leverage: Leverage,
) -> Option<Rebalance> {
    let price_ratio = ratio(new.value(), old.value())?;
    let losing_side = match price_ratio.cmp(&Decimal::ONE) {
        std::cmp::Ordering::Equal => {
            return Some(Rebalance {
                long_balance,
                short_balance,
                losing_side: None,
                transfer: Decimal::ZERO,
            })
        }
        std::cmp::Ordering::Greater => Side::Short,
        std::cmp::Ordering::Less => Side::Long,
    };

    let multiplier = loss_multiplier(price_ratio, leverage)?;
    let rebalance = match losing_side {
        Side::Short => {
            let loss = scale(short_balance, multiplier)?.min(short_balance);
            Rebalance {
                long_balance: long_balance.checked_add(loss)?,
                short_balance: short_balance - loss,
                losing_side: Some(Side::Short),
                transfer: loss,
            }
        }
        Side::Long => {
            let loss = scale(long_balance, multiplier)?.min(long_balance);
            Rebalance {
                long_balance: long_balance - loss,
                short_balance: short_balance.checked_add(loss)?,
                losing_side: Some(Side::Long),
                transfer: loss,
            }
        }
    };
    Some(rebalance)
}

// 2.4: shares minted for `amount_in` of settlement asset.
// claims = live supply + shares already burned into pending exit commitments.
// an empty side (no balance or no claims) mints 1:1.
pub fn mint_amount(
    amount_in: Decimal,
    token_supply: Decimal,
    pending_burn: Decimal,
    side_balance: Decimal,
) -> Option<Decimal> {
    let claims = token_supply.checked_add(pending_burn)?;
    if side_balance.is_zero() || claims.is_zero() {
        return Some(amount_in);
    }
    mul_div(amount_in, claims, side_balance)
}

// 2.5: settlement asset paid out for `shares_in`. pending_burn must include shares_in.
pub fn burn_amount(
    shares_in: Decimal,
    side_balance: Decimal,
    token_supply: Decimal,
    pending_burn: Decimal,
) -> Option<Decimal> {
    let claims = token_supply.checked_add(pending_burn)?;
    mul_div(shares_in, side_balance, claims)
}
