//! Pair Discovery (Scanner)
//!
//! Builds a universe of liquid perpetuals, groups them by sector,
//! generates candidate pairs (same-sector plus a bounded cross-sector
//! set), evaluates every candidate with the fitness engine, ranks the
//! survivors by conviction and publishes a bounded watchlist. Only the
//! selected subset gets the expensive hourly-resolution divergence
//! profiling that sets each pair's entry threshold.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::pacer::Pacer;
use crate::config::Config;
use crate::domain::{PairSymbol, WatchlistEntry};
use crate::fitness::{self, spread, FitnessConfig, PairFitness, ReversionProfile};
use crate::ports::market_data::{InstrumentInfo, Interval, MarketDataError, MarketDataPort};
use crate::ports::persistence::{PersistencePort, StoreError};

/// Scanner tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub min_volume_24h: f64,
    pub min_open_interest: f64,
    pub same_sector_min_correlation: f64,
    pub cross_sector_min_correlation: f64,
    pub cross_sector_top_k: usize,
    pub max_half_life_days: f64,
    pub top_per_sector: usize,
    pub top_cross_sector: usize,
    pub history_days: usize,
    pub profile_hours: usize,
    /// Entry threshold when profiling finds no qualifying level.
    pub default_entry_threshold: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            min_volume_24h: 5_000_000.0,
            min_open_interest: 1_000_000.0,
            same_sector_min_correlation: 0.7,
            cross_sector_min_correlation: 0.85,
            cross_sector_top_k: 3,
            max_half_life_days: 30.0,
            top_per_sector: 3,
            top_cross_sector: 2,
            history_days: 90,
            profile_hours: 360,
            default_entry_threshold: 2.0,
        }
    }
}

impl From<&Config> for ScannerConfig {
    fn from(config: &Config) -> Self {
        Self {
            min_volume_24h: config.scanner.min_volume_24h,
            min_open_interest: config.scanner.min_open_interest,
            same_sector_min_correlation: config.scanner.same_sector_min_correlation,
            cross_sector_min_correlation: config.scanner.cross_sector_min_correlation,
            cross_sector_top_k: config.scanner.cross_sector_top_k,
            max_half_life_days: config.scanner.max_half_life_days,
            top_per_sector: config.scanner.top_per_sector,
            top_cross_sector: config.scanner.top_cross_sector,
            history_days: config.scanner.history_days,
            profile_hours: config.scanner.profile_hours,
            default_entry_threshold: config.monitor.default_entry_threshold,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("market data unavailable: {0}")]
    Upstream(#[from] MarketDataError),

    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// What a scan did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub universe: usize,
    pub candidates: usize,
    pub evaluated: usize,
    pub rejected_correlation: usize,
    pub rejected_cointegration: usize,
    pub rejected_half_life: usize,
    pub rejected_hurst: usize,
    pub selected: usize,
    pub pruned: usize,
}

struct Candidate {
    pair: PairSymbol,
    sector: String,
    cross_sector: bool,
}

struct Scored {
    candidate: Candidate,
    fitness: PairFitness,
}

pub struct Scanner<M, P> {
    market: Arc<M>,
    store: Arc<P>,
    cfg: ScannerConfig,
    fitness_cfg: FitnessConfig,
    pacer: Arc<Pacer>,
}

impl<M: MarketDataPort, P: PersistencePort> Scanner<M, P> {
    pub fn new(
        market: Arc<M>,
        store: Arc<P>,
        cfg: ScannerConfig,
        fitness_cfg: FitnessConfig,
        pacer: Arc<Pacer>,
    ) -> Self {
        Self {
            market,
            store,
            cfg,
            fitness_cfg,
            pacer,
        }
    }

    /// Run one full discovery scan and publish the watchlist.
    pub async fn run_scan(&self) -> Result<ScanReport, ScanError> {
        let mut report = ScanReport::default();

        let universe = self.build_universe().await?;
        report.universe = universe.len();
        if universe.len() < 2 {
            warn!(universe = universe.len(), "universe too small, nothing to scan");
            return Ok(report);
        }

        let candidates = self.generate_candidates(&universe);
        report.candidates = candidates.len();
        info!(
            universe = report.universe,
            candidates = report.candidates,
            "scanning pair candidates"
        );

        let closes = self.fetch_daily_closes(&universe).await;
        let scored = self.evaluate_candidates(candidates, &closes, &mut report);
        let selected = self.select(scored);
        report.selected = selected.len();

        report.pruned = self.publish(selected).await?;
        info!(
            selected = report.selected,
            pruned = report.pruned,
            "scan complete"
        );
        Ok(report)
    }

    /// Tradeable universe: liquidity floor plus blacklist filter.
    async fn build_universe(&self) -> Result<Vec<InstrumentInfo>, ScanError> {
        let blacklist: HashSet<String> = self
            .store
            .list_blacklist()
            .await?
            .into_iter()
            .map(|b| b.symbol)
            .collect();

        let instruments = self.market.instruments().await?;
        let universe: Vec<InstrumentInfo> = instruments
            .into_iter()
            .filter(|i| {
                use rust_decimal::prelude::ToPrimitive;
                let volume = i.volume_24h.to_f64().unwrap_or(0.0);
                let oi = i.open_interest.to_f64().unwrap_or(0.0);
                if blacklist.contains(&i.symbol) {
                    debug!(symbol = %i.symbol, "blacklisted, skipping");
                    return false;
                }
                volume >= self.cfg.min_volume_24h && oi >= self.cfg.min_open_interest
            })
            .collect();
        Ok(universe)
    }

    /// Same-sector combinations plus cross-sector pairs drawn from the
    /// top-K most liquid instruments per sector.
    fn generate_candidates(&self, universe: &[InstrumentInfo]) -> Vec<Candidate> {
        let mut sectors: BTreeMap<&str, Vec<&InstrumentInfo>> = BTreeMap::new();
        for info in universe {
            sectors.entry(info.sector.as_str()).or_default().push(info);
        }
        for members in sectors.values_mut() {
            members.sort_by(|a, b| b.volume_24h.cmp(&a.volume_24h));
        }

        let mut candidates = Vec::new();
        for (sector, members) in &sectors {
            for i in 0..members.len() {
                for j in (i + 1)..members.len() {
                    candidates.push(Candidate {
                        pair: PairSymbol::new(&members[i].symbol, &members[j].symbol),
                        sector: sector.to_string(),
                        cross_sector: false,
                    });
                }
            }
        }

        // cross-sector: only the most liquid per sector qualify
        let leaders: Vec<&InstrumentInfo> = sectors
            .values()
            .flat_map(|members| members.iter().take(self.cfg.cross_sector_top_k))
            .copied()
            .collect();
        for i in 0..leaders.len() {
            for j in (i + 1)..leaders.len() {
                if leaders[i].sector == leaders[j].sector {
                    continue;
                }
                candidates.push(Candidate {
                    pair: PairSymbol::new(&leaders[i].symbol, &leaders[j].symbol),
                    sector: leaders[i].sector.clone(),
                    cross_sector: true,
                });
            }
        }
        candidates
    }

    /// One paced daily-candle fetch per instrument; failures drop the
    /// instrument (and its pairs) from this scan only.
    async fn fetch_daily_closes(&self, universe: &[InstrumentInfo]) -> HashMap<String, Vec<f64>> {
        let mut closes = HashMap::new();
        for info in universe {
            self.pacer.pause().await;
            match self
                .market
                .candles(&info.symbol, Interval::Day, self.cfg.history_days)
                .await
            {
                Ok(candles) => {
                    closes.insert(info.symbol.clone(), candles.iter().map(|c| c.close).collect());
                }
                Err(e) => {
                    warn!(symbol = %info.symbol, error = %e, "history fetch failed, skipping instrument");
                }
            }
        }
        closes
    }

    fn evaluate_candidates(
        &self,
        candidates: Vec<Candidate>,
        closes: &HashMap<String, Vec<f64>>,
        report: &mut ScanReport,
    ) -> Vec<Scored> {
        let mut scored = Vec::new();
        for candidate in candidates {
            let (Some(c1), Some(c2)) = (
                closes.get(&candidate.pair.leg1),
                closes.get(&candidate.pair.leg2),
            ) else {
                continue;
            };

            // align on the most recent common length
            let len = c1.len().min(c2.len());
            if len < 3 {
                continue;
            }
            let p1 = &c1[c1.len() - len..];
            let p2 = &c2[c2.len() - len..];

            let fitness = match fitness::evaluate_pair(p1, p2, &self.fitness_cfg) {
                Ok(f) => f,
                Err(e) => {
                    debug!(pair = %candidate.pair, error = %e, "evaluation failed");
                    continue;
                }
            };
            report.evaluated += 1;

            let min_correlation = if candidate.cross_sector {
                self.cfg.cross_sector_min_correlation
            } else {
                self.cfg.same_sector_min_correlation
            };
            if fitness.correlation < min_correlation {
                report.rejected_correlation += 1;
                continue;
            }
            if !fitness.is_cointegrated {
                report.rejected_cointegration += 1;
                continue;
            }
            match fitness.half_life.days() {
                Some(d) if d <= self.cfg.max_half_life_days => {}
                _ => {
                    report.rejected_half_life += 1;
                    continue;
                }
            }
            if !fitness.hurst.is_mean_reverting() {
                report.rejected_hurst += 1;
                continue;
            }

            debug!(
                pair = %candidate.pair,
                conviction = format!("{:.1}", fitness.conviction),
                correlation = format!("{:.3}", fitness.correlation),
                half_life = %fitness.half_life,
                "viable pair"
            );
            scored.push(Scored { candidate, fitness });
        }
        scored
    }

    /// Top-N per sector plus top-M cross-sector, by conviction.
    fn select(&self, mut scored: Vec<Scored>) -> Vec<Scored> {
        scored.sort_by(|a, b| {
            b.fitness
                .conviction
                .partial_cmp(&a.fitness.conviction)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut per_sector: HashMap<String, usize> = HashMap::new();
        let mut cross_taken = 0usize;
        let mut selected = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for item in scored {
            if !seen.insert(item.candidate.pair.key()) {
                continue;
            }
            if item.candidate.cross_sector {
                if cross_taken < self.cfg.top_cross_sector {
                    cross_taken += 1;
                    selected.push(item);
                }
            } else {
                let taken = per_sector.entry(item.candidate.sector.clone()).or_insert(0);
                if *taken < self.cfg.top_per_sector {
                    *taken += 1;
                    selected.push(item);
                }
            }
        }
        selected
    }

    /// Hourly divergence profiling for one selected pair.
    async fn profile_pair(&self, scored: &Scored) -> Option<ReversionProfile> {
        self.pacer.pause().await;
        let h1 = self
            .market
            .candles(&scored.candidate.pair.leg1, Interval::Hour, self.cfg.profile_hours)
            .await;
        self.pacer.pause().await;
        let h2 = self
            .market
            .candles(&scored.candidate.pair.leg2, Interval::Hour, self.cfg.profile_hours)
            .await;

        let (h1, h2) = match (h1, h2) {
            (Ok(a), Ok(b)) => (a, b),
            _ => {
                warn!(pair = %scored.candidate.pair, "hourly history unavailable, profiling skipped");
                return None;
            }
        };

        let len = h1.len().min(h2.len());
        if len < self.fitness_cfg.z_window + 2 {
            return None;
        }
        let p1: Vec<f64> = h1[h1.len() - len..].iter().map(|c| c.close).collect();
        let p2: Vec<f64> = h2[h2.len() - len..].iter().map(|c| c.close).collect();

        let spread = spread::log_spread(&p1, &p2, scored.fitness.beta);
        let zs = spread::rolling_z_series(&spread, self.fitness_cfg.z_window);
        if zs.is_empty() {
            return None;
        }
        Some(fitness::reversion::profile(&zs))
    }

    /// Upsert the selection (preserving discovery-time identity for pairs
    /// already listed) and prune stale entries that back no position.
    async fn publish(&self, selected: Vec<Scored>) -> Result<usize, ScanError> {
        let now = Utc::now();
        let existing: HashMap<String, WatchlistEntry> = self
            .store
            .list_watchlist()
            .await?
            .into_iter()
            .map(|e| (e.key(), e))
            .collect();

        let mut entries = Vec::with_capacity(selected.len());
        let mut selected_keys = HashSet::new();

        for item in selected {
            let profile = self.profile_pair(&item).await;
            let (entry_threshold, max_z, warning) = match &profile {
                Some(p) => {
                    let threshold = p.optimal_entry(self.cfg.default_entry_threshold);
                    (threshold, p.max_abs_z, p.warning_at(threshold))
                }
                None => (
                    self.cfg.default_entry_threshold,
                    item.fitness.z_score.abs(),
                    false,
                ),
            };

            let key = item.candidate.pair.key();
            selected_keys.insert(key.clone());

            let entry = match existing.get(&key) {
                Some(previous) => {
                    // refresh in place: discovery-time identity survives
                    let mut entry = previous.clone();
                    entry.refresh(item.fitness, now);
                    entry.entry_threshold = entry_threshold;
                    entry.is_ready = entry.fitness.z_score.abs() >= entry_threshold;
                    entry.max_historical_z = max_z.max(previous.max_historical_z);
                    entry.reversion_warning = warning;
                    entry
                }
                None => WatchlistEntry::new(
                    item.candidate.pair,
                    item.candidate.sector,
                    item.candidate.cross_sector,
                    entry_threshold,
                    max_z,
                    warning,
                    item.fitness,
                    now,
                ),
            };
            entries.push(entry);
        }

        self.store.upsert_watchlist_bulk(&entries).await?;

        // prune: gone from the selection and not backing an open position
        let open_keys: HashSet<String> = self
            .store
            .list_positions()
            .await?
            .iter()
            .map(|p| p.pair.key())
            .collect();

        let mut pruned = 0usize;
        for key in existing.keys() {
            if !selected_keys.contains(key) && !open_keys.contains(key) {
                self.store.delete_watchlist(key).await?;
                pruned += 1;
            }
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::{candles_from_closes, MemoryStore, MockMarketData};
    use rust_decimal::Decimal;

    fn instrument(symbol: &str, sector: &str, volume: i64) -> InstrumentInfo {
        InstrumentInfo {
            symbol: symbol.to_string(),
            sector: sector.to_string(),
            volume_24h: Decimal::from(volume),
            open_interest: Decimal::from(volume / 2),
        }
    }

    fn scanner_with(market: MockMarketData) -> Scanner<MockMarketData, MemoryStore> {
        let cfg = ScannerConfig {
            min_volume_24h: 1_000.0,
            min_open_interest: 100.0,
            ..ScannerConfig::default()
        };
        Scanner::new(
            Arc::new(market),
            Arc::new(MemoryStore::new()),
            cfg,
            FitnessConfig::default(),
            Arc::new(Pacer::disabled()),
        )
    }

    #[test]
    fn same_sector_combinations() {
        let market = MockMarketData::new();
        let scanner = scanner_with(market);
        let universe = vec![
            instrument("A", "l1", 10_000),
            instrument("B", "l1", 9_000),
            instrument("C", "l1", 8_000),
            instrument("D", "defi", 7_000),
        ];
        let candidates = scanner.generate_candidates(&universe);
        let same: Vec<_> = candidates.iter().filter(|c| !c.cross_sector).collect();
        let cross: Vec<_> = candidates.iter().filter(|c| c.cross_sector).collect();
        // l1 has 3 choose 2 = 3 pairs, defi has none (single member)
        assert_eq!(same.len(), 3);
        // every l1 leader pairs with the lone defi leader
        assert_eq!(cross.len(), 3);
    }

    #[tokio::test]
    async fn universe_filters_liquidity_and_blacklist() {
        let market = MockMarketData::new();
        let store = Arc::new(MemoryStore::new());
        store
            .add_blacklist(&crate::ports::persistence::BlacklistEntry {
                symbol: "BAD".to_string(),
                reason: "test".to_string(),
                added_at: Utc::now(),
            })
            .await
            .unwrap();

        let market = market
            .with_instrument(instrument("GOOD", "l1", 1_000_000))
            .with_instrument(instrument("THIN", "l1", 10))
            .with_instrument(instrument("BAD", "l1", 1_000_000));

        let scanner = Scanner::new(
            Arc::new(market),
            store,
            ScannerConfig {
                min_volume_24h: 1_000.0,
                min_open_interest: 100.0,
                ..ScannerConfig::default()
            },
            FitnessConfig::default(),
            Arc::new(Pacer::disabled()),
        );
        let universe = scanner.build_universe().await.unwrap();
        assert_eq!(universe.len(), 1);
        assert_eq!(universe[0].symbol, "GOOD");
    }

    #[tokio::test]
    async fn scan_publishes_cointegrated_pair() {
        // two power-law-related series, strongly mean-reverting spread
        let (base, derived) = crate::fitness::testutil::synthetic_pair(90, 0.9, 0.8);

        let market = MockMarketData::new()
            .with_instrument(instrument("AAA", "l1", 1_000_000))
            .with_instrument(instrument("BBB", "l1", 900_000))
            .with_candles("AAA", Interval::Day, candles_from_closes(&derived))
            .with_candles("BBB", Interval::Day, candles_from_closes(&base))
            .with_candles("AAA", Interval::Hour, candles_from_closes(&derived))
            .with_candles("BBB", Interval::Hour, candles_from_closes(&base));

        let store = Arc::new(MemoryStore::new());
        let scanner = Scanner::new(
            Arc::new(market),
            Arc::clone(&store),
            ScannerConfig {
                min_volume_24h: 1_000.0,
                min_open_interest: 100.0,
                ..ScannerConfig::default()
            },
            FitnessConfig::default(),
            Arc::new(Pacer::disabled()),
        );

        let report = scanner.run_scan().await.unwrap();
        assert_eq!(report.universe, 2);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.selected, 1);

        let watchlist = store.list_watchlist().await.unwrap();
        assert_eq!(watchlist.len(), 1);
        let entry = &watchlist[0];
        assert!(entry.fitness.is_cointegrated);
        assert!(entry.fitness.correlation > 0.99);
        assert!(entry.entry_threshold >= 1.5);
    }

    #[tokio::test]
    async fn stale_entries_without_positions_are_pruned() {
        let (base, derived) = crate::fitness::testutil::synthetic_pair(90, 0.9, 0.8);

        let market = MockMarketData::new()
            .with_instrument(instrument("AAA", "l1", 1_000_000))
            .with_instrument(instrument("BBB", "l1", 900_000))
            .with_candles("AAA", Interval::Day, candles_from_closes(&derived))
            .with_candles("BBB", Interval::Day, candles_from_closes(&base))
            .with_candles("AAA", Interval::Hour, candles_from_closes(&derived))
            .with_candles("BBB", Interval::Hour, candles_from_closes(&base));

        let store = Arc::new(MemoryStore::new());

        // a leftover entry from a previous scan whose pair is now illiquid
        let stale = WatchlistEntry::new(
            PairSymbol::new("OLD", "GONE"),
            "l1",
            false,
            2.0,
            2.0,
            false,
            crate::fitness::evaluate_pair(&derived, &base, &FitnessConfig::default()).unwrap(),
            Utc::now(),
        );
        store.upsert_watchlist(&stale).await.unwrap();

        let scanner = Scanner::new(
            Arc::new(market),
            Arc::clone(&store),
            ScannerConfig {
                min_volume_24h: 1_000.0,
                min_open_interest: 100.0,
                ..ScannerConfig::default()
            },
            FitnessConfig::default(),
            Arc::new(Pacer::disabled()),
        );

        let report = scanner.run_scan().await.unwrap();
        assert_eq!(report.pruned, 1);
        let keys: Vec<String> = store
            .list_watchlist()
            .await
            .unwrap()
            .iter()
            .map(|e| e.key())
            .collect();
        assert!(!keys.contains(&"GONE-OLD".to_string()));
        assert!(keys.contains(&"AAA-BBB".to_string()));
    }
}
