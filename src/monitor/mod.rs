//! Trade Lifecycle Monitor
//!
//! Consumes the watchlist and the open-position set, re-evaluates fitness
//! for each, advances the position state machine, and enforces admission
//! control across the capacity-constrained pool. Each pair's
//! fetch-evaluate-transition is isolated: a failed fetch skips that pair
//! for the cycle and never applies a partial transition. When capacity is
//! free and nothing on the watchlist is enterable, the cycle report asks
//! the orchestrator for a fresh scan instead of entering a low-quality
//! pair merely to use the slot.

pub mod entry;
pub mod exit;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::pacer::Pacer;
use crate::config::Config;
use crate::domain::{
    check_entry, health, Direction, EntryTicket, ExitReason, HealthInputs, HistoryRecord,
    PairSymbol, Position, WatchlistEntry, DEFAULT_EXIT_THRESHOLD,
};
use crate::fitness::{self, spread, FitnessConfig, PairFitness};
use crate::ports::market_data::{Interval, MarketDataError, MarketDataPort};
use crate::ports::notifier::NotifierPort;
use crate::ports::persistence::{PersistencePort, StoreError};

pub use entry::{validate_entry, EntryReject};
pub use exit::{decide_exit, stop_level, ExitDecision};

/// Monitor tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub max_positions: usize,
    pub default_entry_threshold: f64,
    pub min_entry_correlation: f64,
    pub exit_correlation: f64,
    pub max_entry_half_life_days: f64,
    pub confirmation_window: usize,
    pub confirmation_fraction: f64,
    pub partial_exit_pnl: f64,
    pub final_exit_pnl: f64,
    pub stop_loss_floor: f64,
    pub stop_entry_multiple: f64,
    pub stop_historical_multiple: f64,
    pub time_stop_half_lives: f64,
    pub position_notional: f64,
    pub fitness: FitnessConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_positions: 5,
            default_entry_threshold: 2.0,
            min_entry_correlation: 0.6,
            exit_correlation: 0.4,
            max_entry_half_life_days: 30.0,
            confirmation_window: 7,
            confirmation_fraction: 0.8,
            partial_exit_pnl: 0.03,
            final_exit_pnl: 0.05,
            stop_loss_floor: 3.0,
            stop_entry_multiple: 1.5,
            stop_historical_multiple: 1.2,
            time_stop_half_lives: 2.0,
            position_notional: 1_000.0,
            fitness: FitnessConfig::default(),
        }
    }
}

impl From<&Config> for MonitorConfig {
    fn from(config: &Config) -> Self {
        let m = &config.monitor;
        Self {
            max_positions: m.max_positions,
            default_entry_threshold: m.default_entry_threshold,
            min_entry_correlation: m.min_entry_correlation,
            exit_correlation: m.exit_correlation,
            max_entry_half_life_days: m.max_entry_half_life_days,
            confirmation_window: m.confirmation_window,
            confirmation_fraction: m.confirmation_fraction,
            partial_exit_pnl: m.partial_exit_pnl,
            final_exit_pnl: m.final_exit_pnl,
            stop_loss_floor: m.stop_loss_floor,
            stop_entry_multiple: m.stop_entry_multiple,
            stop_historical_multiple: m.stop_historical_multiple,
            time_stop_half_lives: m.time_stop_half_lives,
            position_notional: m.position_notional,
            fitness: FitnessConfig {
                z_window: m.z_window,
                structural_window: m.structural_window,
                ..FitnessConfig::default()
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("market data unavailable: {0}")]
    Upstream(#[from] MarketDataError),

    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),

    #[error("fitness unavailable: {0}")]
    Fitness(#[from] fitness::FitnessError),

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("entry rejected: {0}")]
    EntryRejected(#[from] EntryReject),
}

/// What one monitor cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub positions_checked: usize,
    pub partial_exits: usize,
    pub final_exits: usize,
    pub entries: usize,
    pub skipped: usize,
    /// Capacity is free and nothing was enterable: ask for a rescan.
    pub rescan_requested: bool,
}

/// Fresh market state for one pair, fetched atomically per cycle item.
struct PairUpdate {
    fitness: PairFitness,
    confirmation_z: Option<f64>,
    leg1_mark: Decimal,
    leg2_mark: Decimal,
}

pub struct Monitor<M, P, N> {
    market: Arc<M>,
    store: Arc<P>,
    notifier: Arc<N>,
    cfg: MonitorConfig,
    pacer: Arc<Pacer>,
}

impl<M, P, N> Monitor<M, P, N>
where
    M: MarketDataPort,
    P: PersistencePort,
    N: NotifierPort,
{
    pub fn new(
        market: Arc<M>,
        store: Arc<P>,
        notifier: Arc<N>,
        cfg: MonitorConfig,
        pacer: Arc<Pacer>,
    ) -> Self {
        Self {
            market,
            store,
            notifier,
            cfg,
            pacer,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.cfg
    }

    /// One full monitor cycle: refresh and transition every open
    /// position, then refresh the watchlist and attempt entries.
    pub async fn run_cycle(&self) -> Result<CycleReport, MonitorError> {
        let mut report = CycleReport::default();
        let now = Utc::now();

        let watchlist = self.store.list_watchlist().await?;
        let exit_thresholds: HashMap<String, f64> = watchlist
            .iter()
            .map(|e| (e.key(), e.exit_threshold))
            .collect();

        // -- open positions first: exits free capacity for entries below --
        let mut position_fitness: HashMap<String, PairFitness> = HashMap::new();
        let positions = self.store.list_positions().await?;
        for mut position in positions {
            report.positions_checked += 1;
            let update = match self.fetch_pair_update(&position.pair).await {
                Ok(u) => u,
                Err(e) => {
                    warn!(pair = %position.pair, error = %e, "refresh failed, skipping this cycle");
                    report.skipped += 1;
                    continue;
                }
            };
            position_fitness.insert(position.pair.key(), update.fitness.clone());
            self.apply_position_update(&mut position, &update);

            let exit_threshold = exit_thresholds
                .get(&position.pair.key())
                .copied()
                .unwrap_or(DEFAULT_EXIT_THRESHOLD);

            match decide_exit(&position, exit_threshold, &self.cfg, now) {
                Some(ExitDecision::Partial(reason)) => {
                    position
                        .take_partial_exit(now)
                        .map_err(|e| MonitorError::StateConflict(e.to_string()))?;
                    // the transition only counts once its write lands
                    self.store.update_position(&position).await?;
                    report.partial_exits += 1;
                    info!(
                        pair = %position.pair,
                        reason = %reason,
                        z = format!("{:.2}", position.current_z),
                        pnl = format!("{:+.2}%", position.partial_exit_pnl * 100.0),
                        "partial exit (50%)"
                    );
                    self.notifier
                        .notify(&format!(
                            "PARTIAL EXIT {} [{}] z={:.2} pnl={:+.2}%",
                            position.pair,
                            reason,
                            position.current_z,
                            position.partial_exit_pnl * 100.0
                        ))
                        .await;
                }
                Some(ExitDecision::Final(reason)) => {
                    self.close_position(&position, reason, now).await?;
                    report.final_exits += 1;
                }
                None => {
                    self.store.update_position(&position).await?;
                    debug!(
                        pair = %position.pair,
                        z = format!("{:.2}", position.current_z),
                        health = %position.health.band,
                        "holding"
                    );
                }
            }
        }

        // -- watchlist refresh and entry attempts --
        let open = self.store.list_positions().await?;
        let open_keys: HashMap<String, ()> = open.iter().map(|p| (p.pair.key(), ())).collect();

        for mut entry in watchlist {
            if open_keys.contains_key(&entry.key()) {
                // positioned pairs reuse the fitness fetched above
                if let Some(fitness) = position_fitness.get(&entry.key()) {
                    entry.refresh(fitness.clone(), now);
                    self.store.upsert_watchlist(&entry).await?;
                }
                continue;
            }

            let update = match self.fetch_pair_update(&entry.pair).await {
                Ok(u) => u,
                Err(e) => {
                    warn!(pair = %entry.pair, error = %e, "watchlist refresh failed, skipping");
                    report.skipped += 1;
                    continue;
                }
            };
            entry.refresh(update.fitness.clone(), now);
            self.store.upsert_watchlist(&entry).await?;

            if report.entries + open.len() >= self.cfg.max_positions {
                continue;
            }

            match self.try_enter(&entry, &update, now).await {
                Ok(position) => {
                    report.entries += 1;
                    info!(
                        pair = %position.pair,
                        direction = %position.direction,
                        z = format!("{:.2}", position.entry_z_score),
                        "entered position"
                    );
                }
                Err(MonitorError::EntryRejected(reason)) => {
                    debug!(pair = %entry.pair, reason = %reason, "entry rejected");
                }
                Err(e) => {
                    warn!(pair = %entry.pair, error = %e, "entry attempt failed");
                    report.skipped += 1;
                }
            }
        }

        let open_count = self.store.list_positions().await?.len();
        report.rescan_requested = open_count < self.cfg.max_positions && report.entries == 0;

        info!(
            positions = report.positions_checked,
            partial_exits = report.partial_exits,
            final_exits = report.final_exits,
            entries = report.entries,
            skipped = report.skipped,
            rescan = report.rescan_requested,
            "monitor cycle complete"
        );
        Ok(report)
    }

    /// Fetch candles and marks for one pair and evaluate fitness. Any
    /// failure here aborts the whole item so no transition can run on
    /// partial data.
    async fn fetch_pair_update(&self, pair: &PairSymbol) -> Result<PairUpdate, MonitorError> {
        let window = self.cfg.fitness.structural_window;

        self.pacer.pause().await;
        let c1 = self.market.candles(&pair.leg1, Interval::Day, window).await?;
        self.pacer.pause().await;
        let c2 = self.market.candles(&pair.leg2, Interval::Day, window).await?;

        let len = c1.len().min(c2.len());
        let p1: Vec<f64> = c1[c1.len() - len..].iter().map(|c| c.close).collect();
        let p2: Vec<f64> = c2[c2.len() - len..].iter().map(|c| c.close).collect();

        let fitness = fitness::evaluate_pair(&p1, &p2, &self.cfg.fitness)?;

        let sp = spread::log_spread(&p1, &p2, fitness.beta);
        let confirmation_z =
            spread::z_score(&sp, self.cfg.confirmation_window).map(|z| z.value);

        self.pacer.pause().await;
        let leg1_mark = self.market.mark_price(&pair.leg1).await?;
        self.pacer.pause().await;
        let leg2_mark = self.market.mark_price(&pair.leg2).await?;

        Ok(PairUpdate {
            fitness,
            confirmation_z,
            leg1_mark,
            leg2_mark,
        })
    }

    fn apply_position_update(&self, position: &mut Position, update: &PairUpdate) {
        let (long_mark, short_mark) = if position.long_asset == position.pair.leg1 {
            (update.leg1_mark, update.leg2_mark)
        } else {
            (update.leg2_mark, update.leg1_mark)
        };
        let pnl = position.pnl(long_mark, short_mark);
        position.apply_update(&update.fitness, pnl, Utc::now());

        position.health = health::score(&HealthInputs {
            entry_z: position.entry_z_score,
            current_z: position.current_z,
            pnl: position.current_pnl,
            correlation: position.current_correlation,
            entry_half_life: position.entry_half_life,
            current_half_life: position.current_half_life,
            current_hurst: position.current_hurst,
            beta_drift: position.beta_drift,
        });
    }

    /// Validate the signal and admission rules, then open the position.
    async fn try_enter(
        &self,
        entry: &WatchlistEntry,
        update: &PairUpdate,
        now: chrono::DateTime<Utc>,
    ) -> Result<Position, MonitorError> {
        validate_entry(entry, &update.fitness, update.confirmation_z, &self.cfg)?;

        let direction = Direction::from_entry_z(update.fitness.z_score);
        let open = self.store.list_positions().await?;
        let (long_asset, short_asset) = match direction {
            Direction::Long => (entry.pair.leg1.as_str(), entry.pair.leg2.as_str()),
            Direction::Short => (entry.pair.leg2.as_str(), entry.pair.leg1.as_str()),
        };
        check_entry(
            &entry.pair.key(),
            long_asset,
            short_asset,
            &open,
            self.cfg.max_positions,
        )
        .map_err(EntryReject::Admission)?;

        // half-life was validated finite above
        let entry_half_life = update
            .fitness
            .half_life
            .days()
            .unwrap_or(self.cfg.max_entry_half_life_days);

        self.open_position(
            EntryTicket {
                pair: entry.pair.clone(),
                direction,
                beta: update.fitness.beta,
                entry_z_score: update.fitness.z_score,
                entry_threshold: entry.entry_threshold,
                entry_half_life,
                max_historical_z: entry.max_historical_z,
                leg1_price: update.leg1_mark,
                leg2_price: update.leg2_mark,
                leg1_funding: Decimal::ZERO,
                leg2_funding: Decimal::ZERO,
                notional: Decimal::from_f64(self.cfg.position_notional)
                    .unwrap_or(Decimal::ONE_THOUSAND),
            },
            now,
        )
        .await
    }

    /// Open and persist a position from a fully validated ticket. Shared
    /// by the signal path and the force-entry command.
    pub async fn open_position(
        &self,
        mut ticket: EntryTicket,
        now: chrono::DateTime<Utc>,
    ) -> Result<Position, MonitorError> {
        self.pacer.pause().await;
        ticket.leg1_funding = self.market.funding_rate(&ticket.pair.leg1).await?;
        self.pacer.pause().await;
        ticket.leg2_funding = self.market.funding_rate(&ticket.pair.leg2).await?;

        let position = Position::open(ticket, now)
            .map_err(|e| MonitorError::StateConflict(e.to_string()))?;
        self.store.create_position(&position).await?;

        self.notifier
            .notify(&format!(
                "ENTER {} {} z={:.2} threshold={:.2} weights={:.2}/{:.2}",
                position.direction,
                position.pair,
                position.entry_z_score,
                position.entry_threshold,
                position.long_weight,
                position.short_weight
            ))
            .await;
        Ok(position)
    }

    /// Final close: archive then remove, as one persistence call.
    pub async fn close_position(
        &self,
        position: &Position,
        reason: ExitReason,
        now: chrono::DateTime<Utc>,
    ) -> Result<HistoryRecord, MonitorError> {
        let record = HistoryRecord::from_position(position, reason, now);
        self.store
            .close_position(&position.pair.key(), &record)
            .await?;

        info!(
            pair = %position.pair,
            reason = %reason,
            pnl = format!("{:+.2}%", record.total_pnl * 100.0),
            days = format!("{:.1}", record.days_in_trade),
            "closed position"
        );
        self.notifier
            .notify(&format!(
                "EXIT {} [{}] z={:.2} pnl={:+.2}% after {:.1}d",
                position.pair, reason, record.exit_z_score, record.total_pnl * 100.0, record.days_in_trade
            ))
            .await;
        Ok(record)
    }

    /// Force an entry from the command interface. Runs the same admission
    /// checks, data fetch, and weight/PnL math as the signal path; only
    /// the signal-threshold gate is bypassed.
    pub async fn force_enter(
        &self,
        pair: PairSymbol,
        direction: Direction,
        notional: Option<Decimal>,
    ) -> Result<Position, MonitorError> {
        let update = self.fetch_pair_update(&pair).await?;

        let open = self.store.list_positions().await?;
        let (long_asset, short_asset) = match direction {
            Direction::Long => (pair.leg1.as_str(), pair.leg2.as_str()),
            Direction::Short => (pair.leg2.as_str(), pair.leg1.as_str()),
        };
        check_entry(&pair.key(), long_asset, short_asset, &open, self.cfg.max_positions)
            .map_err(EntryReject::Admission)?;

        let entry_half_life = update
            .fitness
            .half_life
            .days()
            .unwrap_or(self.cfg.max_entry_half_life_days);

        self.open_position(
            EntryTicket {
                pair,
                direction,
                beta: update.fitness.beta,
                entry_z_score: update.fitness.z_score,
                entry_threshold: self.cfg.default_entry_threshold,
                entry_half_life,
                max_historical_z: update.fitness.z_score.abs().max(self.cfg.stop_loss_floor),
                leg1_price: update.leg1_mark,
                leg2_price: update.leg2_mark,
                leg1_funding: Decimal::ZERO,
                leg2_funding: Decimal::ZERO,
                notional: notional.unwrap_or_else(|| {
                    Decimal::from_f64(self.cfg.position_notional).unwrap_or(Decimal::ONE_THOUSAND)
                }),
            },
            Utc::now(),
        )
        .await
    }

    /// Force an exit from the command interface. Refreshes the position
    /// so the archived PnL uses live marks, then closes through the same
    /// path as rule-driven exits.
    pub async fn force_exit(&self, pair: &PairSymbol) -> Result<HistoryRecord, MonitorError> {
        let open = self.store.list_positions().await?;
        let mut position = open
            .into_iter()
            .find(|p| p.pair.key() == pair.key())
            .ok_or_else(|| MonitorError::StateConflict(format!("no open position for {pair}")))?;

        match self.fetch_pair_update(&position.pair).await {
            Ok(update) => self.apply_position_update(&mut position, &update),
            Err(e) => {
                warn!(pair = %position.pair, error = %e, "refresh failed, closing on stale marks");
            }
        }
        self.close_position(&position, ExitReason::Manual, Utc::now()).await
    }
}
