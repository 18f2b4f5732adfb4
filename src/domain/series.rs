//! Price history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC-derived observation. Only the close and volume matter to the
/// fitness engine; the full candle stays at the exchange adapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub volume: f64,
}

/// Ordered close history for one instrument. Windows are read-only views
/// derived from a single fetch; the underlying candles are never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub candles: Vec<Candle>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            candles,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// All closes, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Closes of the most recent `n` observations (clamped to length).
    pub fn tail_closes(&self, n: usize) -> Vec<f64> {
        let start = self.candles.len().saturating_sub(n);
        self.candles[start..].iter().map(|c| c.close).collect()
    }
}
