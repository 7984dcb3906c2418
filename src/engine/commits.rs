// 8.2 engine/commits.rs: user-facing queue operations.

use super::core::SettlementEngine;
use super::results::EngineError;
use crate::commitment::Commitment;
use crate::token::Token;
use crate::types::{AccountId, CommitId, CommitType};
use rust_decimal::Decimal;

impl<T: Token> SettlementEngine<T> {
    /// Lets the pool pull up to `amount` of `owner`'s settlement asset when committing.
    pub fn approve_settlement(&mut self, owner: AccountId, amount: Decimal) -> Result<(), EngineError> {
        self.ledger.approve_settlement(owner, amount)?;
        Ok(())
    }

    pub fn commit(
        &mut self,
        owner: AccountId,
        commit_type: CommitType,
        amount: Decimal,
    ) -> Result<CommitId, EngineError> {
        let id = self.committer.commit(
            &mut self.ledger,
            owner,
            commit_type,
            amount,
            self.current_time,
            &mut self.events,
        )?;
        Ok(id)
    }

    pub fn uncommit(&mut self, caller: AccountId, id: CommitId) -> Result<Commitment, EngineError> {
        let commitment = self
            .committer
            .uncommit(&mut self.ledger, caller, id, self.current_time, &mut self.events)?;
        Ok(commitment)
    }

    pub fn get_commit(&self, id: CommitId) -> Option<&Commitment> {
        self.committer.get_commit(id)
    }

    pub fn pending_commitments(&self) -> impl Iterator<Item = &Commitment> {
        self.committer.pending()
    }
}
