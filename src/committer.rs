//! Commitment queue.
//!
//! Users commit to entering or exiting a side; the asset is escrowed immediately but
//! the mint or burn only happens during an upkeep, and only once the commitment is
//! older than the front-running interval at the new price's timestamp. That stops
//! anyone from committing (or withdrawing) after seeing the price they would settle at.

use crate::commitment::{Commitment, ShadowPools, UnexecutedWindow};
use crate::events::{CommitEvent, CommitExecutedEvent, CommitFailedEvent, EventEmitter, EventPayload};
use crate::ledger::{CommitterAccess, LedgerError, PoolLedger, UpkeepPermit};
use crate::math;
use crate::token::Token;
use crate::types::{AccountId, CommitId, CommitType, Side, Timestamp};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    #[error("commitment amount must not be zero")]
    ZeroAmount,

    #[error("commitment amount must not be negative, got {0}")]
    NegativeAmount(Decimal),

    #[error("commitment {0} not found")]
    NotFound(CommitId),

    #[error("{caller} may not withdraw commitment {id} owned by {owner}")]
    Unauthorized {
        id: CommitId,
        caller: AccountId,
        owner: AccountId,
    },

    #[error("shadow pool for {commit_type} holds less than {amount}")]
    ShadowUnderflow { commit_type: CommitType, amount: Decimal },

    #[error("fixed-point overflow in {0}")]
    MathOverflow(&'static str),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// What one side looked like when the batch started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SideRate {
    balance: Decimal,
    token_supply: Decimal,
    pending_burn: Decimal,
}

/// Every commitment in a batch is priced off the same post-fee balances and claim
/// totals, so the rate a user gets does not depend on where they sit in the queue.
#[derive(Debug, Clone, Copy)]
struct BatchSnapshot {
    long: SideRate,
    short: SideRate,
}

impl BatchSnapshot {
    fn capture<T: Token>(ledger: &PoolLedger<T>, shadow: &ShadowPools) -> Self {
        let side_rate = |side: Side| SideRate {
            balance: ledger.balance(side),
            token_supply: ledger.tokens().share(side).total_supply(),
            pending_burn: shadow.pending_burn(side),
        };
        Self {
            long: side_rate(Side::Long),
            short: side_rate(Side::Short),
        }
    }

    fn rate(&self, side: Side) -> SideRate {
        match side {
            Side::Long => self.long,
            Side::Short => self.short,
        }
    }
}

/// Outcome of one `execute_all_commitments` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub executed: Vec<CommitId>,
    // failed downstream and refunded
    pub failed: Vec<CommitId>,
    // first id left for a later upkeep, if the batch stopped early
    pub deferred_from: Option<CommitId>,
}

#[derive(Debug, Clone)]
pub struct PoolCommitter {
    address: AccountId,
    commitments: BTreeMap<CommitId, Commitment>,
    shadow: ShadowPools,
    window: UnexecutedWindow,
    next_id: CommitId,
}

impl PoolCommitter {
    pub fn new(address: AccountId) -> Self {
        Self {
            address,
            commitments: BTreeMap::new(),
            shadow: ShadowPools::new(),
            window: UnexecutedWindow::new(),
            next_id: CommitId::FIRST,
        }
    }

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn get_commit(&self, id: CommitId) -> Option<&Commitment> {
        self.commitments.get(&id)
    }

    pub fn shadow(&self) -> &ShadowPools {
        &self.shadow
    }

    pub fn window(&self) -> &UnexecutedWindow {
        &self.window
    }

    pub fn pending(&self) -> impl Iterator<Item = &Commitment> {
        self.commitments.values()
    }

    pub fn pending_count(&self) -> usize {
        self.commitments.len()
    }

    pub fn next_id(&self) -> CommitId {
        self.next_id
    }

    /// Queue a mint or burn. Entries pull the settlement asset from `owner` (who must
    /// have approved the pool); exits burn `owner`'s shares now and pay out later.
    pub fn commit<T: Token>(
        &mut self,
        ledger: &mut PoolLedger<T>,
        owner: AccountId,
        commit_type: CommitType,
        amount: Decimal,
        now: Timestamp,
        events: &mut impl EventEmitter,
    ) -> Result<CommitId, CommitError> {
        if amount.is_zero() {
            return Err(CommitError::ZeroAmount);
        }
        if amount < Decimal::ZERO {
            return Err(CommitError::NegativeAmount(amount));
        }

        if !self.shadow.can_add(commit_type, amount) {
            return Err(CommitError::MathOverflow("shadow pool"));
        }

        let mut access = ledger.as_committer(self.address)?;
        if commit_type.is_mint() {
            access.quote_token_transfer_from(owner, amount)?;
        } else {
            access.burn_tokens(commit_type.side(), amount, owner)?;
        }

        let id = self.next_id;
        self.next_id = id.next();
        self.commitments.insert(
            id,
            Commitment {
                id,
                commit_type,
                amount,
                owner,
                created_at: now,
            },
        );
        self.shadow.add(commit_type, amount);
        self.window.push(id);

        debug!(%id, %commit_type, %amount, %owner, "commitment created");
        events.emit(
            now,
            EventPayload::CommitCreated(CommitEvent {
                id,
                commit_type,
                amount,
                owner,
            }),
        );
        Ok(id)
    }

    /// Withdraw a queued commitment and get the escrow back. Owner only.
    pub fn uncommit<T: Token>(
        &mut self,
        ledger: &mut PoolLedger<T>,
        caller: AccountId,
        id: CommitId,
        now: Timestamp,
        events: &mut impl EventEmitter,
    ) -> Result<Commitment, CommitError> {
        let commitment = self.commitments.get(&id).cloned().ok_or(CommitError::NotFound(id))?;
        if commitment.owner != caller {
            return Err(CommitError::Unauthorized {
                id,
                caller,
                owner: commitment.owner,
            });
        }
        self.check_forgettable(&commitment)?;

        self.refund(ledger, &commitment)?;
        self.forget(&commitment)?;
        self.window.remove(id);

        debug!(%id, owner = %commitment.owner, "commitment withdrawn");
        events.emit(
            now,
            EventPayload::CommitRemoved(CommitEvent {
                id,
                commit_type: commitment.commit_type,
                amount: commitment.amount,
                owner: commitment.owner,
            }),
        );
        Ok(commitment)
    }

    /// Settle every queued commitment old enough for the permit's price timestamp, in
    /// id order, stopping at the first one that is still too recent.
    ///
    /// A commitment whose execution fails is refunded exactly as if its owner had
    /// withdrawn it, and the batch moves on. An error returned from here means a refund
    /// itself failed; the caller must discard the whole upkeep.
    pub fn execute_all_commitments<T: Token>(
        &mut self,
        ledger: &mut PoolLedger<T>,
        permit: UpkeepPermit,
        events: &mut impl EventEmitter,
    ) -> Result<BatchResult, CommitError> {
        let mut result = BatchResult::default();
        let Some((earliest, latest)) = self.window.bounds() else {
            return Ok(result);
        };

        let now = permit.price_timestamp();
        let snapshot = BatchSnapshot::capture(ledger, &self.shadow);

        let mut id = earliest;
        loop {
            if let Some(commitment) = self.commitments.get(&id).cloned() {
                if !commitment.is_settleable(now, permit.front_running_interval()) {
                    // ids are handed out in time order, everything after is newer still
                    self.window.advance_to(id);
                    result.deferred_from = Some(id);
                    return Ok(result);
                }

                match self.execute_commitment(ledger, &snapshot, &commitment) {
                    Ok(amount_out) => {
                        self.forget(&commitment)?;
                        events.emit(
                            now,
                            EventPayload::CommitExecuted(CommitExecutedEvent {
                                id,
                                commit_type: commitment.commit_type,
                                owner: commitment.owner,
                                amount_in: commitment.amount,
                                amount_out,
                            }),
                        );
                        result.executed.push(id);
                    }
                    Err(err) => {
                        warn!(%id, error = %err, "commitment execution failed, refunding");
                        self.refund(ledger, &commitment)?;
                        self.forget(&commitment)?;
                        events.emit(
                            now,
                            EventPayload::CommitFailed(CommitFailedEvent {
                                id,
                                commit_type: commitment.commit_type,
                                owner: commitment.owner,
                                amount_refunded: commitment.amount,
                                reason: err.to_string(),
                            }),
                        );
                        result.failed.push(id);
                    }
                }
            }

            if id == latest {
                self.window.clear();
                return Ok(result);
            }
            id = id.next();
        }
    }

    // Executes one commitment against the batch snapshot. Every fallible step runs
    // before the balance write, and token calls are all-or-nothing, so an Err here
    // leaves the ledger exactly as it was.
    fn execute_commitment<T: Token>(
        &self,
        ledger: &mut PoolLedger<T>,
        snapshot: &BatchSnapshot,
        commitment: &Commitment,
    ) -> Result<Decimal, CommitError> {
        let side = commitment.commit_type.side();
        let rate = snapshot.rate(side);
        let mut access = ledger.as_committer(self.address)?;

        if commitment.commit_type.is_mint() {
            let minted = math::mint_amount(commitment.amount, rate.token_supply, rate.pending_burn, rate.balance)
                .ok_or(CommitError::MathOverflow("mint amount"))?;
            let new_balance = access
                .balance(side)
                .checked_add(commitment.amount)
                .ok_or(CommitError::MathOverflow("pool balance"))?;

            access.mint_tokens(side, minted, commitment.owner)?;
            set_side_balance(&mut access, side, new_balance)?;
            Ok(minted)
        } else {
            let payout = math::burn_amount(commitment.amount, rate.balance, rate.token_supply, rate.pending_burn)
                .ok_or(CommitError::MathOverflow("burn amount"))?;
            let available = access.balance(side);
            if payout > available {
                return Err(LedgerError::InsufficientPoolBalance {
                    side,
                    requested: payout,
                    available,
                }
                .into());
            }

            access.quote_token_transfer(commitment.owner, payout)?;
            set_side_balance(&mut access, side, available - payout)?;
            Ok(payout)
        }
    }

    // Hand the escrow back: settlement asset for entries, re-minted shares for exits.
    fn refund<T: Token>(&self, ledger: &mut PoolLedger<T>, commitment: &Commitment) -> Result<(), CommitError> {
        let mut access = ledger.as_committer(self.address)?;
        if commitment.commit_type.is_mint() {
            access.quote_token_transfer(commitment.owner, commitment.amount)?;
        } else {
            access.mint_tokens(commitment.commit_type.side(), commitment.amount, commitment.owner)?;
        }
        Ok(())
    }

    fn check_forgettable(&self, commitment: &Commitment) -> Result<(), CommitError> {
        if !self.shadow.can_remove(commitment.commit_type, commitment.amount) {
            return Err(CommitError::ShadowUnderflow {
                commit_type: commitment.commit_type,
                amount: commitment.amount,
            });
        }
        Ok(())
    }

    // Drop the record and its shadow amount together.
    fn forget(&mut self, commitment: &Commitment) -> Result<(), CommitError> {
        self.check_forgettable(commitment)?;
        self.shadow.remove(commitment.commit_type, commitment.amount);
        self.commitments.remove(&commitment.id);
        Ok(())
    }
}

fn set_side_balance<T: Token>(
    access: &mut CommitterAccess<'_, T>,
    side: Side,
    balance: Decimal,
) -> Result<(), LedgerError> {
    let (long, short) = access.balances();
    match side {
        Side::Long => access.set_new_pool_balances(balance, short),
        Side::Short => access.set_new_pool_balances(long, balance),
    }
}
