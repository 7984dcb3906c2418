// 3.0 token.rs: the token primitives the pool consumes. transfer, mint, burn, supply.
// TokenLedger is in-memory: balances and allowances only, no chain.
// every mutating call validates first and writes last, so a failed call changes nothing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::types::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenOperation {
    Transfer,
    Mint,
    Burn,
}

impl fmt::Display for TokenOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenOperation::Transfer => write!(f, "transfer"),
            TokenOperation::Mint => write!(f, "mint"),
            TokenOperation::Burn => write!(f, "burn"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("{symbol}: insufficient balance for {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        symbol: String,
        account: AccountId,
        requested: Decimal,
        available: Decimal,
    },

    #[error("{symbol}: insufficient allowance from {owner} to {spender}: requested {requested}, approved {approved}")]
    InsufficientAllowance {
        symbol: String,
        owner: AccountId,
        spender: AccountId,
        requested: Decimal,
        approved: Decimal,
    },

    #[error("{symbol}: invalid amount {amount}")]
    InvalidAmount { symbol: String, amount: Decimal },

    #[error("{symbol}: zero address")]
    ZeroAddress { symbol: String },

    #[error("{symbol}: {operation} is paused")]
    Paused { symbol: String, operation: TokenOperation },
}

// The interface the pool needs from any fungible token. Implement this to back the
// settlement asset or the share tokens with something other than TokenLedger.
pub trait Token {
    fn symbol(&self) -> &str;

    fn total_supply(&self) -> Decimal;

    fn balance_of(&self, account: AccountId) -> Decimal;

    fn allowance(&self, owner: AccountId, spender: AccountId) -> Decimal;

    fn approve(&mut self, owner: AccountId, spender: AccountId, amount: Decimal) -> Result<(), TokenError>;

    fn transfer(&mut self, from: AccountId, to: AccountId, amount: Decimal) -> Result<(), TokenError>;

    // moves `amount` from `from` to `to`, spending `spender`'s allowance
    fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError>;

    fn mint(&mut self, amount: Decimal, to: AccountId) -> Result<(), TokenError>;

    fn burn(&mut self, amount: Decimal, from: AccountId) -> Result<(), TokenError>;
}

#[derive(Debug, Clone)]
pub struct TokenLedger {
    symbol: String,
    balances: HashMap<AccountId, Decimal>,
    allowances: HashMap<(AccountId, AccountId), Decimal>,
    total_supply: Decimal,
    paused: HashSet<TokenOperation>,
}

impl TokenLedger {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: Decimal::ZERO,
            paused: HashSet::new(),
        }
    }

    // pausing an operation makes every call of it fail. models a downstream revert.
    pub fn set_paused(&mut self, operation: TokenOperation, paused: bool) {
        if paused {
            self.paused.insert(operation);
        } else {
            self.paused.remove(&operation);
        }
    }

    pub fn is_paused(&self, operation: TokenOperation) -> bool {
        self.paused.contains(&operation)
    }

    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|b| !b.is_zero()).count()
    }

    fn check_live(&self, operation: TokenOperation) -> Result<(), TokenError> {
        if self.is_paused(operation) {
            return Err(TokenError::Paused {
                symbol: self.symbol.clone(),
                operation,
            });
        }
        Ok(())
    }

    fn check_amount(&self, amount: Decimal) -> Result<(), TokenError> {
        if amount < Decimal::ZERO {
            return Err(TokenError::InvalidAmount {
                symbol: self.symbol.clone(),
                amount,
            });
        }
        Ok(())
    }

    fn check_address(&self, account: AccountId) -> Result<(), TokenError> {
        if account.is_zero() {
            return Err(TokenError::ZeroAddress {
                symbol: self.symbol.clone(),
            });
        }
        Ok(())
    }

    fn check_balance(&self, account: AccountId, amount: Decimal) -> Result<(), TokenError> {
        let available = self.balance_of(account);
        if amount > available {
            return Err(TokenError::InsufficientBalance {
                symbol: self.symbol.clone(),
                account,
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    fn credit(&mut self, account: AccountId, amount: Decimal) {
        *self.balances.entry(account).or_insert(Decimal::ZERO) += amount;
    }

    fn debit(&mut self, account: AccountId, amount: Decimal) {
        *self.balances.entry(account).or_insert(Decimal::ZERO) -= amount;
    }
}

impl Token for TokenLedger {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn total_supply(&self) -> Decimal {
        self.total_supply
    }

    fn balance_of(&self, account: AccountId) -> Decimal {
        self.balances.get(&account).copied().unwrap_or(Decimal::ZERO)
    }

    fn allowance(&self, owner: AccountId, spender: AccountId) -> Decimal {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn approve(&mut self, owner: AccountId, spender: AccountId, amount: Decimal) -> Result<(), TokenError> {
        self.check_amount(amount)?;
        self.check_address(owner)?;
        self.check_address(spender)?;
        self.allowances.insert((owner, spender), amount);
        Ok(())
    }

    fn transfer(&mut self, from: AccountId, to: AccountId, amount: Decimal) -> Result<(), TokenError> {
        self.check_live(TokenOperation::Transfer)?;
        self.check_amount(amount)?;
        self.check_address(to)?;
        self.check_balance(from, amount)?;

        self.debit(from, amount);
        self.credit(to, amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        let approved = self.allowance(from, spender);
        if amount > approved {
            return Err(TokenError::InsufficientAllowance {
                symbol: self.symbol.clone(),
                owner: from,
                spender,
                requested: amount,
                approved,
            });
        }

        self.transfer(from, to, amount)?;
        self.allowances.insert((from, spender), approved - amount);
        Ok(())
    }

    fn mint(&mut self, amount: Decimal, to: AccountId) -> Result<(), TokenError> {
        self.check_live(TokenOperation::Mint)?;
        self.check_amount(amount)?;
        self.check_address(to)?;

        self.credit(to, amount);
        self.total_supply += amount;
        Ok(())
    }

    fn burn(&mut self, amount: Decimal, from: AccountId) -> Result<(), TokenError> {
        self.check_live(TokenOperation::Burn)?;
        self.check_amount(amount)?;
        self.check_balance(from, amount)?;

        self.debit(from, amount);
        self.total_supply -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ALICE: AccountId = AccountId(1);
    const BOB: AccountId = AccountId(2);
    const POOL: AccountId = AccountId(100);

    fn funded() -> TokenLedger {
        let mut usdc = TokenLedger::new("USDC");
        usdc.mint(dec!(1000), ALICE).unwrap();
        usdc
    }

    #[test]
    fn mint_and_transfer() {
        let mut usdc = funded();
        usdc.transfer(ALICE, BOB, dec!(250)).unwrap();

        assert_eq!(usdc.balance_of(ALICE), dec!(750));
        assert_eq!(usdc.balance_of(BOB), dec!(250));
        assert_eq!(usdc.total_supply(), dec!(1000));
        assert_eq!(usdc.holder_count(), 2);
    }

    #[test]
    fn overdraft_rejected_without_side_effects() {
        let mut usdc = funded();
        let result = usdc.transfer(ALICE, BOB, dec!(1001));

        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
        assert_eq!(usdc.balance_of(ALICE), dec!(1000));
        assert_eq!(usdc.balance_of(BOB), Decimal::ZERO);
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let mut usdc = funded();
        usdc.approve(ALICE, POOL, dec!(300)).unwrap();

        usdc.transfer_from(POOL, ALICE, POOL, dec!(200)).unwrap();
        assert_eq!(usdc.balance_of(POOL), dec!(200));
        assert_eq!(usdc.allowance(ALICE, POOL), dec!(100));

        let result = usdc.transfer_from(POOL, ALICE, POOL, dec!(101));
        assert!(matches!(result, Err(TokenError::InsufficientAllowance { .. })));
        assert_eq!(usdc.allowance(ALICE, POOL), dec!(100));
    }

    #[test]
    fn burn_reduces_supply() {
        let mut shares = funded();
        shares.burn(dec!(400), ALICE).unwrap();

        assert_eq!(shares.total_supply(), dec!(600));
        assert_eq!(shares.balance_of(ALICE), dec!(600));
        assert!(shares.burn(dec!(601), ALICE).is_err());
    }

    #[test]
    fn paused_operation_fails() {
        let mut shares = funded();
        shares.set_paused(TokenOperation::Mint, true);

        let result = shares.mint(dec!(1), BOB);
        assert!(matches!(result, Err(TokenError::Paused { operation: TokenOperation::Mint, .. })));
        assert_eq!(shares.total_supply(), dec!(1000));

        // other operations are unaffected
        shares.transfer(ALICE, BOB, dec!(1)).unwrap();

        shares.set_paused(TokenOperation::Mint, false);
        shares.mint(dec!(1), BOB).unwrap();
        assert_eq!(shares.balance_of(BOB), dec!(2));
    }

    #[test]
    fn rejects_zero_address_and_negative_amounts() {
        let mut usdc = funded();
        assert!(matches!(usdc.mint(dec!(1), AccountId::ZERO), Err(TokenError::ZeroAddress { .. })));
        assert!(matches!(usdc.transfer(ALICE, BOB, dec!(-5)), Err(TokenError::InvalidAmount { .. })));
    }
}
