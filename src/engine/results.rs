// 8.0.2: result types and errors for engine operations.

use crate::committer::{BatchResult, CommitError};
use crate::config::ConfigError;
use crate::ledger::{LedgerError, PriceChangeOutcome};
use crate::types::Timestamp;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpkeepResult {
    pub price_timestamp: Timestamp,
    pub price_change: PriceChangeOutcome,
    pub keeper_reward: Decimal,
    pub batch: BatchResult,
}

impl UpkeepResult {
    pub fn executed(&self) -> usize {
        self.batch.executed.len()
    }

    pub fn failed(&self) -> usize {
        self.batch.failed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Commit error: {0}")]
    Commit(#[from] CommitError),
}
