//! Replay market data
//!
//! Serves the market-data port from a recorded JSON snapshot, for paper
//! runs and offline experiments against captured exchange data. Mark
//! prices fall back to the last daily close when the snapshot carries no
//! explicit mark.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::Candle;
use crate::ports::market_data::{InstrumentInfo, Interval, MarketDataError, MarketDataPort};

/// On-disk snapshot layout.
#[derive(Debug, Clone, Deserialize)]
struct ReplaySnapshot {
    instruments: Vec<InstrumentInfo>,
    #[serde(default)]
    daily: HashMap<String, Vec<Candle>>,
    #[serde(default)]
    hourly: HashMap<String, Vec<Candle>>,
    #[serde(default)]
    mark_prices: HashMap<String, Decimal>,
    #[serde(default)]
    funding_rates: HashMap<String, Decimal>,
}

pub struct ReplayMarketData {
    data: ReplaySnapshot,
}

impl ReplayMarketData {
    /// Empty in-memory snapshot, for wiring that never touches market
    /// data (e.g. store-only commands).
    pub fn empty() -> Self {
        Self {
            data: ReplaySnapshot {
                instruments: Vec::new(),
                daily: HashMap::new(),
                hourly: HashMap::new(),
                mark_prices: HashMap::new(),
                funding_rates: HashMap::new(),
            },
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MarketDataError> {
        let file = File::open(path.as_ref())
            .map_err(|e| MarketDataError::Connection(format!("failed to open snapshot: {e}")))?;
        let data: ReplaySnapshot = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| MarketDataError::Parse(format!("failed to parse snapshot: {e}")))?;
        if data.instruments.is_empty() {
            return Err(MarketDataError::Parse("snapshot has no instruments".to_string()));
        }
        Ok(Self { data })
    }

    fn series(&self, symbol: &str, interval: Interval) -> Result<&Vec<Candle>, MarketDataError> {
        let map = match interval {
            Interval::Day => &self.data.daily,
            Interval::Hour => &self.data.hourly,
        };
        map.get(symbol)
            .ok_or_else(|| MarketDataError::UnknownInstrument(symbol.to_string()))
    }
}

#[async_trait]
impl MarketDataPort for ReplayMarketData {
    async fn instruments(&self) -> Result<Vec<InstrumentInfo>, MarketDataError> {
        Ok(self.data.instruments.clone())
    }

    async fn candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let series = self.series(symbol, interval)?;
        let start = series.len().saturating_sub(limit);
        Ok(series[start..].to_vec())
    }

    async fn mark_price(&self, symbol: &str) -> Result<Decimal, MarketDataError> {
        if let Some(price) = self.data.mark_prices.get(symbol) {
            return Ok(*price);
        }
        let series = self.series(symbol, Interval::Day)?;
        let last = series
            .last()
            .ok_or_else(|| MarketDataError::UnknownInstrument(symbol.to_string()))?;
        Decimal::from_f64(last.close)
            .ok_or_else(|| MarketDataError::Parse(format!("non-finite close for {symbol}")))
    }

    async fn funding_rate(&self, symbol: &str) -> Result<Decimal, MarketDataError> {
        Ok(self
            .data
            .funding_rates
            .get(symbol)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    fn is_connected(&self) -> bool {
        true
    }
}
