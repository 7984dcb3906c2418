// 8.0 engine/core.rs: main engine. one pool's ledger, its committer, the audit log and the clock.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::commitment::ShadowPools;
use crate::committer::PoolCommitter;
use crate::config::PoolConfig;
use crate::events::{Event, EventLog};
use crate::ledger::{PoolLedger, PoolRoles, PoolToken, PoolTokens};
use crate::token::{Token, TokenLedger, TokenOperation};
use crate::types::{PoolId, Timestamp};
use rust_decimal::Decimal;
use tracing::info;

/** 8.1: main engine struct. all pool state lives here */
#[derive(Debug, Clone)]
pub struct SettlementEngine<T = TokenLedger> {
    pub(super) config: EngineConfig,
    pub(super) pool_id: PoolId,
    pub(super) ledger: PoolLedger<T>,
    pub(super) committer: PoolCommitter,
    pub(super) events: EventLog,
    pub(super) current_time: Timestamp,
}

impl<T: Token> SettlementEngine<T> {
    pub fn new(
        config: EngineConfig,
        pool_id: PoolId,
        pool_config: PoolConfig,
        roles: PoolRoles,
        tokens: PoolTokens<T>,
        now: Timestamp,
    ) -> Result<Self, EngineError> {
        let ledger = PoolLedger::new(pool_config, roles, tokens, now)?;
        let committer = PoolCommitter::new(roles.committer);
        let events = EventLog::new(config.max_events, config.verbose);

        info!(
            %pool_id,
            pool = %ledger.config().name,
            leverage = %ledger.leverage(),
            update_interval = ledger.update_interval(),
            front_running_interval = ledger.front_running_interval(),
            "pool deployed"
        );

        Ok(Self {
            config,
            pool_id,
            ledger,
            committer,
            events,
            current_time: now,
        })
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, secs: i64) {
        self.current_time = self.current_time.plus_secs(secs);
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    pub fn pool_config(&self) -> &PoolConfig {
        self.ledger.config()
    }

    pub fn ledger(&self) -> &PoolLedger<T> {
        &self.ledger
    }

    pub fn committer(&self) -> &PoolCommitter {
        &self.committer
    }

    pub fn roles(&self) -> &PoolRoles {
        self.ledger.roles()
    }

    pub fn tokens(&self) -> &PoolTokens<T> {
        self.ledger.tokens()
    }

    pub fn long_balance(&self) -> Decimal {
        self.ledger.long_balance()
    }

    pub fn short_balance(&self) -> Decimal {
        self.ledger.short_balance()
    }

    pub fn shadow(&self) -> &ShadowPools {
        self.committer.shadow()
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        self.events.recent(count)
    }
}

impl SettlementEngine<TokenLedger> {
    /// Deploys a pool over an existing settlement token, creating fresh share tokens
    /// named after the pool (e.g. "3L-ETH/USD").
    pub fn with_settlement(
        config: EngineConfig,
        pool_id: PoolId,
        pool_config: PoolConfig,
        roles: PoolRoles,
        settlement: TokenLedger,
        now: Timestamp,
    ) -> Result<Self, EngineError> {
        let tokens = PoolTokens {
            long: TokenLedger::new(&pool_config.long_token_symbol()),
            short: TokenLedger::new(&pool_config.short_token_symbol()),
            settlement,
        };
        Self::new(config, pool_id, pool_config, roles, tokens, now)
    }

    /// Halts or resumes one operation on one of the pool's tokens.
    pub fn set_token_paused(&mut self, token: PoolToken, operation: TokenOperation, paused: bool) {
        self.ledger.set_token_paused(token, operation, paused);
    }
}
