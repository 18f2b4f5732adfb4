//! Watchlist entries
//!
//! A watchlist entry is created by the scanner, refreshed in place by the
//! monitor every cycle, and deleted by the scanner only when it is no
//! longer a top candidate and is not backing an open position.
//! `initial_beta` is the hedge ratio when the pair was first discovered
//! and is immutable afterward; the live hedge lives in the fitness
//! snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pair::PairSymbol;
use crate::fitness::PairFitness;

/// Default reversion target for exits.
pub const DEFAULT_EXIT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub pair: PairSymbol,
    pub sector: String,
    pub cross_sector: bool,
    /// Z-score magnitude required before the pair signals.
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    /// Worst divergence seen in the discovery-time history.
    pub max_historical_z: f64,
    /// Hedge ratio at discovery. Never updated.
    pub initial_beta: f64,
    /// Latest fitness snapshot.
    pub fitness: PairFitness,
    /// Signal at or beyond the entry threshold.
    pub is_ready: bool,
    /// Discovery-time profiling showed poor reversion at this level.
    pub reversion_warning: bool,
    pub discovered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WatchlistEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pair: PairSymbol,
        sector: impl Into<String>,
        cross_sector: bool,
        entry_threshold: f64,
        max_historical_z: f64,
        reversion_warning: bool,
        fitness: PairFitness,
        now: DateTime<Utc>,
    ) -> Self {
        let is_ready = fitness.z_score.abs() >= entry_threshold;
        Self {
            pair,
            sector: sector.into(),
            cross_sector,
            entry_threshold,
            exit_threshold: DEFAULT_EXIT_THRESHOLD,
            max_historical_z,
            initial_beta: fitness.beta,
            fitness,
            is_ready,
            reversion_warning,
            discovered_at: now,
            updated_at: now,
        }
    }

    /// Refresh the live metrics in place. Discovery-time fields
    /// (`initial_beta`, `discovered_at`) are untouched.
    pub fn refresh(&mut self, fitness: PairFitness, now: DateTime<Utc>) {
        self.is_ready = fitness.z_score.abs() >= self.entry_threshold;
        self.fitness = fitness;
        self.updated_at = now;
    }

    pub fn key(&self) -> String {
        self.pair.key()
    }
}
