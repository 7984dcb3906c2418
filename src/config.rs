// 9.0 config.rs: pool settings in one place. intervals, leverage, fees.
// 9.1 roles live in ledger.rs (PoolRoles); this file is the numbers only.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Leverage;

// Longest update interval a pool may use: one year
pub const MAX_INTERVAL_SECS: i64 = 365 * 86_400;

// Complete configuration for one leveraged pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    // Reference market, e.g. "ETH/USD"
    pub name: String,
    // Collateral every commitment is denominated in
    pub settlement_symbol: String,
    // Minimum seconds between upkeeps
    pub update_interval_secs: i64,
    // A commitment must be older than this (at the price timestamp) to settle
    pub front_running_interval_secs: i64,
    // Multiplier applied to each price move
    pub leverage: Decimal,
    // Fraction of each side's balance charged per upkeep
    pub fee_rate: Decimal,
    // Flat settlement-asset reward paid to the keeper per upkeep
    pub keeper_reward: Decimal,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::eth_usd_3x()
    }
}

impl PoolConfig {
    // Hourly 3x ETH pool, 5 minute front-running window
    pub fn eth_usd_3x() -> Self {
        Self {
            name: "ETH/USD".to_string(),
            settlement_symbol: "USDC".to_string(),
            update_interval_secs: 3_600,
            front_running_interval_secs: 300,
            leverage: dec!(3),
            fee_rate: dec!(0.0001), // 1 bp per interval
            keeper_reward: Decimal::ZERO,
        }
    }

    // Daily 1x BTC pool with a keeper reward
    pub fn btc_usd_1x() -> Self {
        Self {
            name: "BTC/USD".to_string(),
            settlement_symbol: "USDC".to_string(),
            update_interval_secs: 86_400,
            front_running_interval_secs: 3_600,
            leverage: Decimal::ONE,
            fee_rate: dec!(0.00005),
            keeper_reward: dec!(1),
        }
    }

    // Parse from JSON and validate in one step
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PoolConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() || self.settlement_symbol.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }

        // a commitment has to be able to age out of the front-running window
        // before the next price lands, otherwise nothing ever settles
        if self.update_interval_secs <= 0
            || self.update_interval_secs > MAX_INTERVAL_SECS
            || self.front_running_interval_secs < 0
            || self.front_running_interval_secs >= self.update_interval_secs
        {
            return Err(ConfigError::InvalidIntervals {
                update_interval: self.update_interval_secs,
                front_running_interval: self.front_running_interval_secs,
            });
        }

        if Leverage::new(self.leverage).is_none() {
            return Err(ConfigError::InvalidLeverage(self.leverage));
        }

        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidFee(self.fee_rate));
        }

        if self.keeper_reward < Decimal::ZERO {
            return Err(ConfigError::InvalidKeeperReward(self.keeper_reward));
        }

        Ok(())
    }

    pub fn leverage(&self) -> Result<Leverage, ConfigError> {
        Leverage::new(self.leverage).ok_or(ConfigError::InvalidLeverage(self.leverage))
    }

    // e.g. "3L-ETH/USD"
    pub fn long_token_symbol(&self) -> String {
        format!("{}L-{}", self.leverage.normalize(), self.name)
    }

    pub fn short_token_symbol(&self) -> String {
        format!("{}S-{}", self.leverage.normalize(), self.name)
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("pool and settlement names must be non-empty")]
    EmptyName,

    #[error("update interval {update_interval}s must be in (0, {max}s] and above front-running interval {front_running_interval}s", max = MAX_INTERVAL_SECS)]
    InvalidIntervals {
        update_interval: i64,
        front_running_interval: i64,
    },

    #[error("leverage {0} must be at least 1")]
    InvalidLeverage(Decimal),

    #[error("fee rate {0} must be in [0, 1)")]
    InvalidFee(Decimal),

    #[error("keeper reward {0} must not be negative")]
    InvalidKeeperReward(Decimal),

    #[error("{0} address must not be zero")]
    ZeroAddress(&'static str),

    #[error("config parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_valid() {
        assert!(PoolConfig::eth_usd_3x().validate().is_ok());
        assert!(PoolConfig::btc_usd_1x().validate().is_ok());
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_front_running_must_be_below_update_interval() {
        let mut config = PoolConfig::default();
        config.front_running_interval_secs = config.update_interval_secs;

        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::InvalidIntervals { .. })));
    }

    #[test]
    fn test_update_interval_capped() {
        let mut config = PoolConfig::default();
        config.update_interval_secs = MAX_INTERVAL_SECS;
        assert!(config.validate().is_ok());

        config.update_interval_secs = MAX_INTERVAL_SECS + 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidIntervals { .. })));

        config.update_interval_secs = i64::MAX;
        config.front_running_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidIntervals { .. })));
    }

    #[test]
    fn test_invalid_leverage() {
        let mut config = PoolConfig::default();
        config.leverage = dec!(0.5);
        assert_eq!(config.validate(), Err(ConfigError::InvalidLeverage(dec!(0.5))));
    }

    #[test]
    fn test_invalid_fee() {
        let mut config = PoolConfig::default();
        config.fee_rate = Decimal::ONE;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFee(_))));

        config.fee_rate = dec!(-0.01);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFee(_))));
    }

    #[test]
    fn test_token_symbols() {
        let config = PoolConfig::eth_usd_3x();
        assert_eq!(config.long_token_symbol(), "3L-ETH/USD");
        assert_eq!(config.short_token_symbol(), "3S-ETH/USD");
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = PoolConfig::btc_usd_1x();
        let json = serde_json::to_string(&config).unwrap();
        let back = PoolConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_from_json_validates() {
        let mut config = PoolConfig::default();
        config.update_interval_secs = 0;
        let json = serde_json::to_string(&config).unwrap();

        assert!(matches!(PoolConfig::from_json(&json), Err(ConfigError::InvalidIntervals { .. })));
        assert!(matches!(PoolConfig::from_json("{not json"), Err(ConfigError::Parse(_))));
    }
}
