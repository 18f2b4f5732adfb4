//! Market data port

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Candle;

/// Market data error type
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("data parsing error: {0}")]
    Parse(String),

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),
}

/// Candle resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Hour,
    Day,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Hour => "1h",
            Interval::Day => "1d",
        }
    }
}

/// One tradeable perpetual with its liquidity stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub symbol: String,
    /// Sector/category label used for pair grouping.
    pub sector: String,
    pub volume_24h: Decimal,
    pub open_interest: Decimal,
}

/// Read-only exchange access required by the core: candle history plus
/// current mark price and funding rate per instrument.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// List the tradeable universe with 24h liquidity stats.
    async fn instruments(&self) -> Result<Vec<InstrumentInfo>, MarketDataError>;

    /// Most recent `limit` candles for an instrument, oldest first.
    async fn candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError>;

    /// Current mark price.
    async fn mark_price(&self, symbol: &str) -> Result<Decimal, MarketDataError>;

    /// Current funding rate.
    async fn funding_rate(&self, symbol: &str) -> Result<Decimal, MarketDataError>;

    /// Connection liveness.
    fn is_connected(&self) -> bool;
}
