// Oracle Integration
//
// The pool only ever consumes a canonical decimal price. Raw feeds report an integer
// answer plus their own decimals; OracleWrapper normalizes that. SmaOracle sits on top of
// any PriceOracle and averages its last N polled prices, which is the "historical
// averaging" source a keeper can settle against instead of spot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::math;
use crate::types::Timestamp;

/// Precision of every price handed to the engine.
pub const CANONICAL_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("price source {0} has no data")]
    NoData(String),

    #[error("source decimals {0} exceed canonical precision")]
    UnsupportedDecimals(u32),

    #[error("raw answer {answer} with {decimals} decimals is out of range")]
    OutOfRange { answer: i128, decimals: u32 },

    #[error("averaging oracle needs at least one period")]
    ZeroPeriods,
}

/// One round as reported by a raw feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRound {
    pub round_id: u64,
    pub answer: i128,
    pub updated_at: Timestamp,
}

/// Whatever the wrapper learned about the price besides its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceMetadata {
    pub round_id: u64,
    pub updated_at: Timestamp,
    pub source_decimals: u32,
}

/// A raw feed (Chainlink-style aggregator, CEX ticker, ...).
pub trait PriceSource {
    fn name(&self) -> &str;

    fn decimals(&self) -> u32;

    fn latest_round(&self) -> Option<RawRound>;
}

/// What the keeper and engine consume. Prices are signed: a glitching feed can report
/// zero or negative values and the engine decides what to do with them.
pub trait PriceOracle {
    fn get_price(&self) -> Result<Decimal, OracleError>;

    fn get_price_and_metadata(&self) -> Result<(Decimal, PriceMetadata), OracleError>;

    fn decimals(&self) -> u32 {
        CANONICAL_DECIMALS
    }

    /// Refresh internal state before a read. Plain wrappers have nothing to refresh.
    fn poll(&mut self) -> Result<(), OracleError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OracleWrapper<S: PriceSource> {
    source: S,
}

impl<S: PriceSource> OracleWrapper<S> {
    pub fn new(source: S) -> Result<Self, OracleError> {
        if source.decimals() > CANONICAL_DECIMALS {
            return Err(OracleError::UnsupportedDecimals(source.decimals()));
        }
        Ok(Self { source })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn latest(&self) -> Result<RawRound, OracleError> {
        self.source
            .latest_round()
            .ok_or_else(|| OracleError::NoData(self.source.name().to_string()))
    }
}

/// Interpret a raw integer answer carrying `decimals` implied places.
pub fn normalize_answer(answer: i128, decimals: u32) -> Result<Decimal, OracleError> {
    Decimal::try_from_i128_with_scale(answer, decimals)
        .map(|price| price.normalize())
        .map_err(|_| OracleError::OutOfRange { answer, decimals })
}

impl<S: PriceSource> PriceOracle for OracleWrapper<S> {
    fn get_price(&self) -> Result<Decimal, OracleError> {
        let round = self.latest()?;
        normalize_answer(round.answer, self.source.decimals())
    }

    fn get_price_and_metadata(&self) -> Result<(Decimal, PriceMetadata), OracleError> {
        let round = self.latest()?;
        let price = normalize_answer(round.answer, self.source.decimals())?;
        Ok((
            price,
            PriceMetadata {
                round_id: round.round_id,
                updated_at: round.updated_at,
                source_decimals: self.source.decimals(),
            },
        ))
    }
}

/// Simple moving average over the last `periods` polls of an inner oracle.
#[derive(Debug, Clone)]
pub struct SmaOracle<O: PriceOracle> {
    inner: O,
    periods: usize,
    samples: VecDeque<Decimal>,
}

impl<O: PriceOracle> SmaOracle<O> {
    pub fn new(inner: O, periods: usize) -> Result<Self, OracleError> {
        if periods == 0 {
            return Err(OracleError::ZeroPeriods);
        }
        Ok(Self {
            inner,
            periods,
            samples: VecDeque::with_capacity(periods),
        })
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut O {
        &mut self.inner
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    fn average(&self) -> Result<Decimal, OracleError> {
        if self.samples.is_empty() {
            return Err(OracleError::NoData("sma".to_string()));
        }
        let sum: Decimal = self.samples.iter().sum();
        math::ratio(sum, Decimal::from(self.samples.len()))
            .ok_or_else(|| OracleError::NoData("sma".to_string()))
    }
}

impl<O: PriceOracle> PriceOracle for SmaOracle<O> {
    fn get_price(&self) -> Result<Decimal, OracleError> {
        self.average()
    }

    fn get_price_and_metadata(&self) -> Result<(Decimal, PriceMetadata), OracleError> {
        let (_, metadata) = self.inner.get_price_and_metadata()?;
        Ok((self.average()?, metadata))
    }

    fn poll(&mut self) -> Result<(), OracleError> {
        self.inner.poll()?;
        let price = self.inner.get_price()?;
        self.samples.push_back(price);
        while self.samples.len() > self.periods {
            self.samples.pop_front();
        }
        Ok(())
    }
}

/// Settable in-memory feed for tests and the simulation binary.
#[derive(Debug, Clone)]
pub struct MockPriceSource {
    name: String,
    decimals: u32,
    round: Option<RawRound>,
}

impl MockPriceSource {
    pub fn new(name: &str, decimals: u32) -> Self {
        Self {
            name: name.to_string(),
            decimals,
            round: None,
        }
    }

    pub fn set_answer(&mut self, answer: i128, updated_at: Timestamp) {
        let round_id = self.round.map(|r| r.round_id + 1).unwrap_or(1);
        self.round = Some(RawRound {
            round_id,
            answer,
            updated_at,
        });
    }

    // convenience: set from a human price, e.g. 2000.5 with 8 decimals → 200050000000
    pub fn set_price(&mut self, price: Decimal, updated_at: Timestamp) {
        let mut scaled = price;
        scaled.rescale(self.decimals);
        self.set_answer(scaled.mantissa(), updated_at);
    }
}

impl PriceSource for MockPriceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn decimals(&self) -> u32 {
        self.decimals
    }

    fn latest_round(&self) -> Option<RawRound> {
        self.round
    }
}
