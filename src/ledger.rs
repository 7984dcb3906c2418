//! Pool ledger: long/short collateral balances, price-change rebalancing, fees, and
//! the only authority allowed to mint, burn or move the pool's tokens.
//!
//! The committer never touches balances directly. It asks for a [`CommitterAccess`]
//! with its own address, and the ledger checks that address against its roles.

use crate::config::{ConfigError, PoolConfig};
use crate::events::{
    EventEmitter, EventPayload, KeeperRewardPaidEvent, PriceChangeAppliedEvent,
    PriceChangeRejectedEvent, RoleChangedEvent,
};
use crate::math::{self, Rebalance};
use crate::token::{Token, TokenError, TokenLedger, TokenOperation};
use crate::types::{AccountId, Leverage, Price, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Who may do what to one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRoles {
    /// The pool's own account in every token ledger (escrow lives here).
    pub pool: AccountId,
    pub committer: AccountId,
    pub keeper: AccountId,
    pub governance: AccountId,
    pub fee_address: AccountId,
}

impl PoolRoles {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let roles = [
            ("pool", self.pool),
            ("committer", self.committer),
            ("keeper", self.keeper),
            ("governance", self.governance),
            ("fee", self.fee_address),
        ];
        for (name, account) in roles {
            if account.is_zero() {
                return Err(ConfigError::ZeroAddress(name));
            }
        }
        Ok(())
    }
}

/// One of the three tokens a pool works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolToken {
    Settlement,
    Share(Side),
}

/// Settlement asset plus one share token per side.
#[derive(Debug, Clone)]
pub struct PoolTokens<T> {
    pub settlement: T,
    pub long: T,
    pub short: T,
}

impl<T> PoolTokens<T> {
    pub fn share(&self, side: Side) -> &T {
        match side {
            Side::Long => &self.long,
            Side::Short => &self.short,
        }
    }

    pub(crate) fn share_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Long => &mut self.long,
            Side::Short => &mut self.short,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{caller} is not the pool committer")]
    NotCommitter { caller: AccountId },

    #[error("{caller} is not the pool keeper")]
    NotKeeper { caller: AccountId },

    #[error("{caller} is not pool governance")]
    NotGovernance { caller: AccountId },

    #[error("{0} address must not be zero")]
    ZeroAddress(&'static str),

    #[error("update interval not elapsed: last price at {last}, next upkeep at {next_allowed}")]
    UpkeepTooEarly { last: Timestamp, next_allowed: Timestamp },

    #[error("{side} balance {available} cannot cover {requested}")]
    InsufficientPoolBalance {
        side: Side,
        requested: Decimal,
        available: Decimal,
    },

    #[error("pool balances must not be negative: long {long}, short {short}")]
    NegativeBalance { long: Decimal, short: Decimal },

    #[error("fixed-point overflow in {0}")]
    MathOverflow(&'static str),

    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

/// Proof that an upkeep is in progress. Only [`PoolLedger::begin_upkeep`] creates one,
/// and executing queued commitments consumes it, so commitments can only be settled as
/// part of an upkeep. Carries the timing snapshot for the batch.
#[derive(Debug)]
pub struct UpkeepPermit {
    price_timestamp: Timestamp,
    front_running_interval: i64,
}

impl UpkeepPermit {
    pub fn price_timestamp(&self) -> Timestamp {
        self.price_timestamp
    }

    pub fn front_running_interval(&self) -> i64 {
        self.front_running_interval
    }
}

/// Outcome of the price-change step of an upkeep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceChangeOutcome {
    Applied { fee: Decimal, rebalance: Rebalance },
    // non-positive price. balances untouched, settlement still proceeds
    Rejected,
}

#[derive(Debug, Clone)]
pub struct PoolLedger<T> {
    config: PoolConfig,
    leverage: Leverage,
    roles: PoolRoles,
    tokens: PoolTokens<T>,
    long_balance: Decimal,
    short_balance: Decimal,
    last_price_timestamp: Timestamp,
}

impl<T: Token> PoolLedger<T> {
    pub fn new(
        config: PoolConfig,
        roles: PoolRoles,
        tokens: PoolTokens<T>,
        now: Timestamp,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        roles.validate()?;
        let leverage = config.leverage()?;
        Ok(Self {
            config,
            leverage,
            roles,
            tokens,
            long_balance: Decimal::ZERO,
            short_balance: Decimal::ZERO,
            last_price_timestamp: now,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn roles(&self) -> &PoolRoles {
        &self.roles
    }

    pub fn tokens(&self) -> &PoolTokens<T> {
        &self.tokens
    }

    pub fn long_balance(&self) -> Decimal {
        self.long_balance
    }

    pub fn short_balance(&self) -> Decimal {
        self.short_balance
    }

    pub fn balance(&self, side: Side) -> Decimal {
        match side {
            Side::Long => self.long_balance,
            Side::Short => self.short_balance,
        }
    }

    pub fn last_price_timestamp(&self) -> Timestamp {
        self.last_price_timestamp
    }

    pub fn update_interval(&self) -> i64 {
        self.config.update_interval_secs
    }

    pub fn front_running_interval(&self) -> i64 {
        self.config.front_running_interval_secs
    }

    pub fn leverage(&self) -> Leverage {
        self.leverage
    }

    pub fn next_upkeep_at(&self) -> Timestamp {
        self.last_price_timestamp.plus_secs(self.update_interval())
    }

    pub fn interval_passed(&self, now: Timestamp) -> bool {
        now >= self.next_upkeep_at()
    }

    /// Lets the pool pull up to `amount` of the owner's settlement asset on commit.
    pub fn approve_settlement(&mut self, owner: AccountId, amount: Decimal) -> Result<(), LedgerError> {
        let pool = self.roles.pool;
        self.tokens.settlement.approve(owner, pool, amount)?;
        Ok(())
    }

    /// Cheap pre-flight for an upkeep: keeper identity and interval. No side effects.
    pub fn check_upkeep(&self, caller: AccountId, now: Timestamp) -> Result<(), LedgerError> {
        if caller != self.roles.keeper {
            return Err(LedgerError::NotKeeper { caller });
        }
        if !self.interval_passed(now) {
            return Err(LedgerError::UpkeepTooEarly {
                last: self.last_price_timestamp,
                next_allowed: self.next_upkeep_at(),
            });
        }
        Ok(())
    }

    /// Starts an upkeep. The price timestamp moves to `now` before any effect is
    /// applied, so a second upkeep inside the same interval fails immediately.
    pub fn begin_upkeep(&mut self, caller: AccountId, now: Timestamp) -> Result<UpkeepPermit, LedgerError> {
        self.check_upkeep(caller, now)?;
        self.last_price_timestamp = now;
        Ok(UpkeepPermit {
            price_timestamp: now,
            front_running_interval: self.front_running_interval(),
        })
    }

    /// Fee, then the leveraged transfer from the losing side to the winning side.
    ///
    /// A non-positive price is not an error: an oracle glitch must not be able to freeze
    /// settlement, so the move is skipped with a `PriceChangeRejected` event and queued
    /// commitments still execute against unchanged balances.
    pub fn execute_price_change(
        &mut self,
        old_price: Decimal,
        new_price: Decimal,
        events: &mut impl EventEmitter,
    ) -> Result<PriceChangeOutcome, LedgerError> {
        let now = self.last_price_timestamp;
        let (Some(old), Some(new)) = (Price::new(old_price), Price::new(new_price)) else {
            warn!(%old_price, %new_price, "non-positive price, skipping rebalance");
            events.emit(
                now,
                EventPayload::PriceChangeRejected(PriceChangeRejectedEvent { old_price, new_price }),
            );
            return Ok(PriceChangeOutcome::Rejected);
        };

        let (long_fee, short_fee) = math::fee_split(self.long_balance, self.short_balance, self.config.fee_rate)
            .ok_or(LedgerError::MathOverflow("fee"))?;
        let fee = long_fee + short_fee;

        let rebalance = math::price_change_transfer(
            self.long_balance - long_fee,
            self.short_balance - short_fee,
            old,
            new,
            self.leverage,
        )
        .ok_or(LedgerError::MathOverflow("price change"))?;

        if !fee.is_zero() {
            let (pool, fee_address) = (self.roles.pool, self.roles.fee_address);
            self.tokens.settlement.transfer(pool, fee_address, fee)?;
        }

        self.long_balance = rebalance.long_balance;
        self.short_balance = rebalance.short_balance;

        debug!(
            %old, %new, %fee,
            transfer = %rebalance.transfer,
            long = %self.long_balance,
            short = %self.short_balance,
            "price change applied"
        );
        events.emit(
            now,
            EventPayload::PriceChangeApplied(PriceChangeAppliedEvent {
                old_price,
                new_price,
                fee,
                losing_side: rebalance.losing_side,
                transfer: rebalance.transfer,
                long_balance: self.long_balance,
                short_balance: self.short_balance,
            }),
        );

        Ok(PriceChangeOutcome::Applied { fee, rebalance })
    }

    /// Keeper tip: the configured flat reward, taken pro rata from both sides and
    /// capped at what the pool holds. Returns the amount paid.
    pub fn pay_keeper_reward(
        &mut self,
        caller: AccountId,
        events: &mut impl EventEmitter,
    ) -> Result<Decimal, LedgerError> {
        if caller != self.roles.keeper {
            return Err(LedgerError::NotKeeper { caller });
        }

        let total = self
            .long_balance
            .checked_add(self.short_balance)
            .ok_or(LedgerError::MathOverflow("keeper reward"))?;
        let reward = self.config.keeper_reward.min(total);
        if reward.is_zero() {
            return Ok(Decimal::ZERO);
        }

        let from_long = math::mul_div(reward, self.long_balance, total)
            .ok_or(LedgerError::MathOverflow("keeper reward"))?;
        let from_short = reward - from_long;
        if from_short > self.short_balance {
            return Err(LedgerError::InsufficientPoolBalance {
                side: Side::Short,
                requested: from_short,
                available: self.short_balance,
            });
        }

        let (pool, keeper) = (self.roles.pool, self.roles.keeper);
        self.tokens.settlement.transfer(pool, keeper, reward)?;
        self.long_balance -= from_long;
        self.short_balance -= from_short;

        debug!(%keeper, %reward, "keeper reward paid");
        events.emit(
            self.last_price_timestamp,
            EventPayload::KeeperRewardPaid(KeeperRewardPaidEvent { keeper, amount: reward }),
        );
        Ok(reward)
    }

    /// The committer's capability. Fails for any caller but the registered committer.
    pub fn as_committer(&mut self, caller: AccountId) -> Result<CommitterAccess<'_, T>, LedgerError> {
        if caller != self.roles.committer {
            return Err(LedgerError::NotCommitter { caller });
        }
        Ok(CommitterAccess { ledger: self })
    }

    pub fn set_fee_address(
        &mut self,
        caller: AccountId,
        fee_address: AccountId,
        now: Timestamp,
        events: &mut impl EventEmitter,
    ) -> Result<(), LedgerError> {
        self.only_governance(caller)?;
        if fee_address.is_zero() {
            return Err(LedgerError::ZeroAddress("fee"));
        }
        let old = std::mem::replace(&mut self.roles.fee_address, fee_address);
        events.emit(now, EventPayload::FeeAddressChanged(RoleChangedEvent { old, new: fee_address }));
        Ok(())
    }

    pub fn set_keeper(
        &mut self,
        caller: AccountId,
        keeper: AccountId,
        now: Timestamp,
        events: &mut impl EventEmitter,
    ) -> Result<(), LedgerError> {
        self.only_governance(caller)?;
        if keeper.is_zero() {
            return Err(LedgerError::ZeroAddress("keeper"));
        }
        let old = std::mem::replace(&mut self.roles.keeper, keeper);
        events.emit(now, EventPayload::KeeperChanged(RoleChangedEvent { old, new: keeper }));
        Ok(())
    }

    pub fn transfer_governance(
        &mut self,
        caller: AccountId,
        governance: AccountId,
        now: Timestamp,
        events: &mut impl EventEmitter,
    ) -> Result<(), LedgerError> {
        self.only_governance(caller)?;
        if governance.is_zero() {
            return Err(LedgerError::ZeroAddress("governance"));
        }
        let old = std::mem::replace(&mut self.roles.governance, governance);
        events.emit(now, EventPayload::GovernanceChanged(RoleChangedEvent { old, new: governance }));
        Ok(())
    }

    fn only_governance(&self, caller: AccountId) -> Result<(), LedgerError> {
        if caller != self.roles.governance {
            return Err(LedgerError::NotGovernance { caller });
        }
        Ok(())
    }
}

impl PoolLedger<TokenLedger> {
    /// Halts or resumes one operation on one of the pool's tokens, the way a token
    /// contract's owner would. Moves no balances.
    pub fn set_token_paused(&mut self, token: PoolToken, operation: TokenOperation, paused: bool) {
        let ledger = match token {
            PoolToken::Settlement => &mut self.tokens.settlement,
            PoolToken::Share(side) => self.tokens.share_mut(side),
        };
        ledger.set_paused(operation, paused);
        warn!(?token, ?operation, paused, "token operation pause toggled");
    }
}

/// Ledger operations reserved for the committer.
pub struct CommitterAccess<'a, T> {
    ledger: &'a mut PoolLedger<T>,
}

impl<'a, T: Token> CommitterAccess<'a, T> {
    pub fn balances(&self) -> (Decimal, Decimal) {
        (self.ledger.long_balance, self.ledger.short_balance)
    }

    pub fn balance(&self, side: Side) -> Decimal {
        self.ledger.balance(side)
    }

    pub fn mint_tokens(&mut self, side: Side, amount: Decimal, to: AccountId) -> Result<(), LedgerError> {
        self.ledger.tokens.share_mut(side).mint(amount, to)?;
        Ok(())
    }

    pub fn burn_tokens(&mut self, side: Side, amount: Decimal, from: AccountId) -> Result<(), LedgerError> {
        self.ledger.tokens.share_mut(side).burn(amount, from)?;
        Ok(())
    }

    // settlement asset out of the pool
    pub fn quote_token_transfer(&mut self, to: AccountId, amount: Decimal) -> Result<(), LedgerError> {
        let pool = self.ledger.roles.pool;
        self.ledger.tokens.settlement.transfer(pool, to, amount)?;
        Ok(())
    }

    // settlement asset into the pool, against the owner's approval
    pub fn quote_token_transfer_from(&mut self, from: AccountId, amount: Decimal) -> Result<(), LedgerError> {
        let pool = self.ledger.roles.pool;
        self.ledger.tokens.settlement.transfer_from(pool, from, pool, amount)?;
        Ok(())
    }

    pub fn set_new_pool_balances(&mut self, long: Decimal, short: Decimal) -> Result<(), LedgerError> {
        if long < Decimal::ZERO || short < Decimal::ZERO {
            return Err(LedgerError::NegativeBalance { long, short });
        }
        self.ledger.long_balance = long;
        self.ledger.short_balance = short;
        Ok(())
    }
}
