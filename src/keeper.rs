// 11.0 keeper.rs: the scheduler side of upkeep. remembers the last price each pool settled
// at, reads the oracle, and hands (last, latest) to the engine once the interval is up.
// 11.1 pools share nothing but the oracle, so one pool failing never blocks another.

use crate::engine::{EngineError, SettlementEngine, UpkeepResult};
use crate::ledger::PriceChangeOutcome;
use crate::oracle::{OracleError, PriceOracle};
use crate::token::Token;
use crate::types::{AccountId, PoolId};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeeperError {
    #[error("pool {0} is not registered with this keeper")]
    UnknownPool(PoolId),

    #[error("pool {0} is already registered")]
    AlreadyRegistered(PoolId),

    #[error("oracle returned non-positive starting price {0}")]
    InvalidStartingPrice(Decimal),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Per-pool price history the keeper needs to form the next (old, new) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeeperEntry {
    // price the pool last rebalanced to
    pub execution_price: Decimal,
    pub last_execution_price: Decimal,
    pub upkeeps: u64,
}

#[derive(Debug, Clone)]
pub struct PoolKeeper {
    address: AccountId,
    pools: HashMap<PoolId, KeeperEntry>,
}

impl PoolKeeper {
    pub fn new(address: AccountId) -> Self {
        Self {
            address,
            pools: HashMap::new(),
        }
    }

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn entry(&self, pool_id: PoolId) -> Option<&KeeperEntry> {
        self.pools.get(&pool_id)
    }

    pub fn execution_price(&self, pool_id: PoolId) -> Option<Decimal> {
        self.entry(pool_id).map(|e| e.execution_price)
    }

    /// Seeds the pool's execution price from the oracle's current reading.
    pub fn register_pool<O: PriceOracle + ?Sized>(
        &mut self,
        pool_id: PoolId,
        oracle: &mut O,
    ) -> Result<Decimal, KeeperError> {
        if self.pools.contains_key(&pool_id) {
            return Err(KeeperError::AlreadyRegistered(pool_id));
        }
        oracle.poll()?;
        let price = oracle.get_price()?;
        if price <= Decimal::ZERO {
            return Err(KeeperError::InvalidStartingPrice(price));
        }

        self.pools.insert(
            pool_id,
            KeeperEntry {
                execution_price: price,
                last_execution_price: price,
                upkeeps: 0,
            },
        );
        debug!(%pool_id, %price, "pool registered with keeper");
        Ok(price)
    }

    pub fn check_upkeep<T: Token + Clone>(&self, engine: &SettlementEngine<T>) -> bool {
        self.pools.contains_key(&engine.pool_id()) && engine.can_upkeep(self.address)
    }

    pub fn perform_upkeep<T: Token + Clone, O: PriceOracle + ?Sized>(
        &mut self,
        engine: &mut SettlementEngine<T>,
        oracle: &mut O,
    ) -> Result<UpkeepResult, KeeperError> {
        if !self.pools.contains_key(&engine.pool_id()) {
            return Err(KeeperError::UnknownPool(engine.pool_id()));
        }
        oracle.poll()?;
        let latest = oracle.get_price()?;
        self.upkeep_at(engine, latest)
    }

    /// Upkeeps every due pool against one oracle reading. Pools that are not due are
    /// left out of the result.
    pub fn perform_upkeep_multiple<T: Token + Clone, O: PriceOracle + ?Sized>(
        &mut self,
        engines: &mut [SettlementEngine<T>],
        oracle: &mut O,
    ) -> Vec<(PoolId, Result<UpkeepResult, KeeperError>)> {
        let latest = oracle.poll().and_then(|_| oracle.get_price());

        let mut results = Vec::new();
        for engine in engines.iter_mut() {
            if !self.check_upkeep(engine) {
                continue;
            }
            let pool_id = engine.pool_id();
            let result = match &latest {
                Ok(price) => self.upkeep_at(engine, *price),
                Err(err) => Err(KeeperError::Oracle(err.clone())),
            };
            if let Err(err) = &result {
                warn!(%pool_id, error = %err, "upkeep failed");
            }
            results.push((pool_id, result));
        }
        results
    }

    fn upkeep_at<T: Token + Clone>(
        &mut self,
        engine: &mut SettlementEngine<T>,
        latest: Decimal,
    ) -> Result<UpkeepResult, KeeperError> {
        let pool_id = engine.pool_id();
        let entry = self.pools.get_mut(&pool_id).ok_or(KeeperError::UnknownPool(pool_id))?;

        let result = engine.upkeep(self.address, entry.execution_price, latest)?;

        entry.upkeeps += 1;
        // a rejected price never becomes the base for the next move
        if matches!(result.price_change, PriceChangeOutcome::Applied { .. }) {
            entry.last_execution_price = entry.execution_price;
            entry.execution_price = latest;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::engine::EngineConfig;
    use crate::ledger::{LedgerError, PoolRoles};
    use crate::oracle::{MockPriceSource, OracleWrapper};
    use crate::token::TokenLedger;
    use crate::types::Timestamp;
    use rust_decimal_macros::dec;

    const KEEPER: AccountId = AccountId(102);

    fn engine(pool_id: u32) -> SettlementEngine {
        let roles = PoolRoles {
            pool: AccountId(100),
            committer: AccountId(101),
            keeper: KEEPER,
            governance: AccountId(103),
            fee_address: AccountId(104),
        };
        SettlementEngine::with_settlement(
            EngineConfig::default(),
            PoolId(pool_id),
            PoolConfig::default(),
            roles,
            TokenLedger::new("USDC"),
            Timestamp::from_secs(0),
        )
        .unwrap()
    }

    fn oracle(price: Decimal) -> OracleWrapper<MockPriceSource> {
        let mut source = MockPriceSource::new("ETH/USD", 8);
        source.set_price(price, Timestamp::from_secs(0));
        OracleWrapper::new(source).unwrap()
    }

    #[test]
    fn register_seeds_execution_price() {
        let mut keeper = PoolKeeper::new(KEEPER);
        let mut feed = oracle(dec!(2000));

        assert_eq!(keeper.register_pool(PoolId(1), &mut feed).unwrap(), dec!(2000));
        assert_eq!(keeper.execution_price(PoolId(1)), Some(dec!(2000)));
        assert_eq!(
            keeper.register_pool(PoolId(1), &mut feed),
            Err(KeeperError::AlreadyRegistered(PoolId(1)))
        );
    }

    #[test]
    fn unregistered_pool_rejected() {
        let mut keeper = PoolKeeper::new(KEEPER);
        let mut pool = engine(7);
        pool.advance_time(3_600);

        let result = keeper.perform_upkeep(&mut pool, &mut oracle(dec!(1)));
        assert_eq!(result.unwrap_err(), KeeperError::UnknownPool(PoolId(7)));
    }

    #[test]
    fn upkeep_records_new_price_only_on_success() {
        let mut keeper = PoolKeeper::new(KEEPER);
        let mut feed = oracle(dec!(2000));
        let mut pool = engine(1);
        keeper.register_pool(PoolId(1), &mut feed).unwrap();

        feed.source_mut().set_price(dec!(2100), Timestamp::from_secs(1_000));
        let early = keeper.perform_upkeep(&mut pool, &mut feed);
        assert!(matches!(
            early,
            Err(KeeperError::Engine(EngineError::Ledger(LedgerError::UpkeepTooEarly { .. })))
        ));
        assert_eq!(keeper.execution_price(PoolId(1)), Some(dec!(2000)));

        pool.advance_time(3_600);
        assert!(keeper.check_upkeep(&pool));
        keeper.perform_upkeep(&mut pool, &mut feed).unwrap();

        let entry = keeper.entry(PoolId(1)).unwrap();
        assert_eq!(entry.execution_price, dec!(2100));
        assert_eq!(entry.last_execution_price, dec!(2000));
        assert_eq!(entry.upkeeps, 1);
        assert!(!keeper.check_upkeep(&pool));
    }

    #[test]
    fn rejected_price_keeps_previous_base() {
        let mut keeper = PoolKeeper::new(KEEPER);
        let mut feed = oracle(dec!(2000));
        let mut pool = engine(1);
        keeper.register_pool(PoolId(1), &mut feed).unwrap();

        feed.source_mut().set_answer(-5, Timestamp::from_secs(3_600));
        pool.advance_time(3_600);
        let result = keeper.perform_upkeep(&mut pool, &mut feed).unwrap();

        assert_eq!(result.price_change, PriceChangeOutcome::Rejected);
        assert_eq!(keeper.execution_price(PoolId(1)), Some(dec!(2000)));
    }

    #[test]
    fn multiple_pools_upkeep_independently() {
        let mut keeper = PoolKeeper::new(KEEPER);
        let mut feed = oracle(dec!(2000));
        let mut pools = vec![engine(1), engine(2)];
        for pool in &pools {
            keeper.register_pool(pool.pool_id(), &mut feed).unwrap();
        }

        // only pool 1 is due
        pools[0].advance_time(3_600);
        let results = keeper.perform_upkeep_multiple(&mut pools, &mut feed);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, PoolId(1));
        assert!(results[0].1.is_ok());
        assert_eq!(keeper.entry(PoolId(2)).unwrap().upkeeps, 0);
    }
}
