// 8.3 engine/upkeep.rs: price change + batch settlement, applied as one unit.
//
// order inside an upkeep:
//   1. interval/keeper guard, price timestamp moves to now
//   2. fee and leveraged rebalance (or a rejected-price event)
//   3. keeper reward
//   4. every settleable commitment, priced off the post-reward balances
// any error in 1-4 restores the ledger and queue and drops the staged events.

use super::core::SettlementEngine;
use super::results::{EngineError, UpkeepResult};
use crate::events::{EventEmitter, EventPayload, PendingEvents, UpkeepPerformedEvent};
use crate::token::Token;
use crate::types::{AccountId, Timestamp};
use rust_decimal::Decimal;
use tracing::{info, warn};

impl<T: Token + Clone> SettlementEngine<T> {
    pub fn can_upkeep(&self, caller: AccountId) -> bool {
        self.ledger.check_upkeep(caller, self.current_time).is_ok()
    }

    pub fn next_upkeep_at(&self) -> Timestamp {
        self.ledger.next_upkeep_at()
    }

    /// Keeper-only. Fails fast with no side effects if called inside the update
    /// interval; otherwise either every step lands or none does.
    pub fn upkeep(
        &mut self,
        caller: AccountId,
        old_price: Decimal,
        new_price: Decimal,
    ) -> Result<UpkeepResult, EngineError> {
        self.ledger.check_upkeep(caller, self.current_time)?;

        let ledger_checkpoint = self.ledger.clone();
        let committer_checkpoint = self.committer.clone();
        let mut staged = PendingEvents::new();

        match self.apply_upkeep(caller, old_price, new_price, &mut staged) {
            Ok(result) => {
                staged.flush_into(&mut self.events);
                Ok(result)
            }
            Err(err) => {
                warn!(pool_id = %self.pool_id, error = %err, "upkeep rolled back");
                self.ledger = ledger_checkpoint;
                self.committer = committer_checkpoint;
                Err(err)
            }
        }
    }

    fn apply_upkeep(
        &mut self,
        caller: AccountId,
        old_price: Decimal,
        new_price: Decimal,
        events: &mut PendingEvents,
    ) -> Result<UpkeepResult, EngineError> {
        let permit = self.ledger.begin_upkeep(caller, self.current_time)?;
        let price_timestamp = permit.price_timestamp();

        let price_change = self.ledger.execute_price_change(old_price, new_price, events)?;
        let keeper_reward = self.ledger.pay_keeper_reward(caller, events)?;
        let batch = self
            .committer
            .execute_all_commitments(&mut self.ledger, permit, events)?;

        let pending = self.committer.pending_count();
        events.emit(
            price_timestamp,
            EventPayload::UpkeepPerformed(UpkeepPerformedEvent {
                pool_id: self.pool_id,
                price_timestamp,
                executed: batch.executed.len(),
                failed: batch.failed.len(),
                pending,
            }),
        );

        info!(
            pool_id = %self.pool_id,
            %price_timestamp,
            %old_price,
            %new_price,
            executed = batch.executed.len(),
            failed = batch.failed.len(),
            pending,
            long = %self.ledger.long_balance(),
            short = %self.ledger.short_balance(),
            "upkeep performed"
        );

        Ok(UpkeepResult {
            price_timestamp,
            price_change,
            keeper_reward,
            batch,
        })
    }
}
