// 8.4 engine/admin.rs: governance-only role rotation.

use super::core::SettlementEngine;
use super::results::EngineError;
use crate::token::Token;
use crate::types::AccountId;

impl<T: Token> SettlementEngine<T> {
    pub fn set_fee_address(&mut self, caller: AccountId, fee_address: AccountId) -> Result<(), EngineError> {
        self.ledger
            .set_fee_address(caller, fee_address, self.current_time, &mut self.events)?;
        Ok(())
    }

    pub fn set_keeper(&mut self, caller: AccountId, keeper: AccountId) -> Result<(), EngineError> {
        self.ledger.set_keeper(caller, keeper, self.current_time, &mut self.events)?;
        Ok(())
    }

    pub fn transfer_governance(&mut self, caller: AccountId, governance: AccountId) -> Result<(), EngineError> {
        self.ledger
            .transfer_governance(caller, governance, self.current_time, &mut self.events)?;
        Ok(())
    }
}
