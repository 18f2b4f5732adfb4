//! Recording in-memory port implementations
//!
//! Used by the integration tests and for paper wiring. Mocks record the
//! calls they receive and serve canned responses configured through
//! builder methods.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::{Candle, HistoryRecord, Position, WatchlistEntry};

use super::market_data::{InstrumentInfo, Interval, MarketDataError, MarketDataPort};
use super::notifier::NotifierPort;
use super::persistence::{BlacklistEntry, PersistencePort, StoreError};

/// Build a daily candle series from a slice of closes.
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: start + Duration::days(i as i64),
            close,
            volume: 1_000_000.0,
        })
        .collect()
}

/// Mock market data port with canned responses and call recording.
#[derive(Default)]
pub struct MockMarketData {
    instruments: Vec<InstrumentInfo>,
    candles: HashMap<(String, Interval), Vec<Candle>>,
    mark_prices: HashMap<String, Decimal>,
    funding_rates: HashMap<String, Decimal>,
    calls: Mutex<Vec<String>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instrument(mut self, info: InstrumentInfo) -> Self {
        self.instruments.push(info);
        self
    }

    pub fn with_candles(mut self, symbol: &str, interval: Interval, candles: Vec<Candle>) -> Self {
        self.candles.insert((symbol.to_string(), interval), candles);
        self
    }

    pub fn with_mark_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.mark_prices.insert(symbol.to_string(), price);
        self
    }

    pub fn with_funding_rate(mut self, symbol: &str, rate: Decimal) -> Self {
        self.funding_rates.insert(symbol.to_string(), rate);
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MarketDataPort for MockMarketData {
    async fn instruments(&self) -> Result<Vec<InstrumentInfo>, MarketDataError> {
        self.record("instruments".to_string());
        Ok(self.instruments.clone())
    }

    async fn candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.record(format!("candles:{}:{}", symbol, interval.as_str()));
        let series = self
            .candles
            .get(&(symbol.to_string(), interval))
            .ok_or_else(|| MarketDataError::UnknownInstrument(symbol.to_string()))?;
        let start = series.len().saturating_sub(limit);
        Ok(series[start..].to_vec())
    }

    async fn mark_price(&self, symbol: &str) -> Result<Decimal, MarketDataError> {
        self.record(format!("mark:{symbol}"));
        self.mark_prices
            .get(symbol)
            .copied()
            .ok_or_else(|| MarketDataError::UnknownInstrument(symbol.to_string()))
    }

    async fn funding_rate(&self, symbol: &str) -> Result<Decimal, MarketDataError> {
        self.record(format!("funding:{symbol}"));
        Ok(self.funding_rates.get(symbol).copied().unwrap_or(Decimal::ZERO))
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct MemoryStoreInner {
    watchlist: HashMap<String, WatchlistEntry>,
    positions: HashMap<String, Position>,
    history: Vec<HistoryRecord>,
    blacklist: Vec<BlacklistEntry>,
}

/// In-memory persistence. All mutations take one lock, so the
/// delete-plus-append contract of `close_position` holds trivially.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistencePort for MemoryStore {
    async fn upsert_watchlist(&self, entry: &WatchlistEntry) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.watchlist.insert(entry.key(), entry.clone());
        Ok(())
    }

    async fn upsert_watchlist_bulk(&self, entries: &[WatchlistEntry]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        for entry in entries {
            inner.watchlist.insert(entry.key(), entry.clone());
        }
        Ok(())
    }

    async fn delete_watchlist(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.watchlist.remove(key);
        Ok(())
    }

    async fn list_watchlist(&self) -> Result<Vec<WatchlistEntry>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut entries: Vec<_> = inner.watchlist.values().cloned().collect();
        entries.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(entries)
    }

    async fn create_position(&self, position: &Position) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let key = position.pair.key();
        if inner.positions.contains_key(&key) {
            return Err(StoreError::Conflict(format!("position {key} already open")));
        }
        inner.positions.insert(key, position.clone());
        Ok(())
    }

    async fn update_position(&self, position: &Position) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let key = position.pair.key();
        if !inner.positions.contains_key(&key) {
            return Err(StoreError::NotFound(format!("position {key}")));
        }
        inner.positions.insert(key, position.clone());
        Ok(())
    }

    async fn close_position(&self, key: &str, record: &HistoryRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .positions
            .remove(key)
            .ok_or_else(|| StoreError::NotFound(format!("position {key}")))?;
        inner.history.push(record.clone());
        Ok(())
    }

    async fn list_positions(&self) -> Result<Vec<Position>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut positions: Vec<_> = inner.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.pair.key().cmp(&b.pair.key()));
        Ok(positions)
    }

    async fn list_history(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().history.clone())
    }

    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>, StoreError> {
        Ok(self.inner.lock().unwrap().blacklist.clone())
    }

    async fn add_blacklist(&self, entry: &BlacklistEntry) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.blacklist.push(entry.clone());
        Ok(())
    }
}

/// Notifier that records every message.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierPort for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
