//! Historical divergence/reversion profiling
//!
//! Scans a historical z-score series for threshold-crossing events and
//! measures how often, and how fast, each divergence level reverted to a
//! target band. The profile backs two watchlist fields: the optimal entry
//! threshold (highest level with a qualifying historical reversion rate)
//! and the reversion warning flag.

use serde::{Deserialize, Serialize};

/// Divergence levels profiled for every selected pair.
pub const THRESHOLDS: [f64; 9] = [1.0, 1.25, 1.5, 1.75, 2.0, 2.25, 2.5, 2.75, 3.0];

/// Fixed reversion target band.
const REVERSION_BAND: f64 = 0.5;
/// Percentage-of-threshold variant of the target band.
const REVERSION_BAND_PCT: f64 = 0.25;

/// Qualifying reversion rate: strict tier, then a degraded tier.
const STRICT_RATE: f64 = 0.9;
const STRICT_MIN_EVENTS: u32 = 3;
const DEGRADED_RATE: f64 = 0.8;
const DEGRADED_MIN_EVENTS: u32 = 2;

/// Entry thresholds never go below this level.
const ENTRY_FLOOR: f64 = 1.5;

/// Reversion rates under this are flagged as a warning.
const WARNING_RATE: f64 = 0.5;

/// Per-threshold crossing statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStats {
    pub threshold: f64,
    /// Number of threshold-crossing events observed.
    pub events: u32,
    /// Events that reverted to |z| <= 0.5.
    pub reverted: u32,
    /// Events that reverted to |z| <= 25% of the threshold.
    pub reverted_pct_band: u32,
    /// Mean bars from crossing to reversion, over reverted events.
    pub avg_bars_to_revert: f64,
}

impl ThresholdStats {
    pub fn reversion_rate(&self) -> Option<f64> {
        if self.events == 0 {
            None
        } else {
            Some(self.reverted as f64 / self.events as f64)
        }
    }
}

/// Full reversion profile of a z-score history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversionProfile {
    pub thresholds: Vec<ThresholdStats>,
    /// Worst divergence magnitude seen in the history.
    pub max_abs_z: f64,
}

impl ReversionProfile {
    /// Highest threshold with a qualifying historical reversion rate,
    /// floored at 1.5. Falls back to `default` when nothing qualifies.
    pub fn optimal_entry(&self, default: f64) -> f64 {
        let qualifying = |min_events: u32, min_rate: f64| {
            self.thresholds
                .iter()
                .rev()
                .find(|t| {
                    t.events >= min_events
                        && t.reversion_rate().map(|r| r >= min_rate).unwrap_or(false)
                })
                .map(|t| t.threshold)
        };

        qualifying(STRICT_MIN_EVENTS, STRICT_RATE)
            .or_else(|| qualifying(DEGRADED_MIN_EVENTS, DEGRADED_RATE))
            .map(|t| t.max(ENTRY_FLOOR))
            .unwrap_or(default)
    }

    /// Reversion rate at the profiled threshold nearest to `threshold`.
    pub fn rate_near(&self, threshold: f64) -> Option<f64> {
        self.thresholds
            .iter()
            .min_by(|a, b| {
                let da = (a.threshold - threshold).abs();
                let db = (b.threshold - threshold).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .and_then(|t| t.reversion_rate())
    }

    /// True when the history shows poor reversion behavior at this level.
    pub fn warning_at(&self, threshold: f64) -> bool {
        match self.rate_near(threshold) {
            Some(rate) => rate < WARNING_RATE,
            None => false, // no events at this level is not evidence against it
        }
    }
}

/// Profile a historical z-score series against the fixed threshold grid.
pub fn profile(zscores: &[f64]) -> ReversionProfile {
    let max_abs_z = zscores.iter().fold(0.0_f64, |m, z| m.max(z.abs()));

    let thresholds = THRESHOLDS
        .iter()
        .map(|&t| scan_threshold(zscores, t))
        .collect();

    ReversionProfile {
        thresholds,
        max_abs_z,
    }
}

/// Scan for crossings of one threshold and their reversion outcomes.
fn scan_threshold(zscores: &[f64], threshold: f64) -> ThresholdStats {
    let mut events = 0u32;
    let mut reverted = 0u32;
    let mut reverted_pct_band = 0u32;
    let mut total_bars = 0u64;

    let pct_band = threshold * REVERSION_BAND_PCT;
    let mut i = 1;
    while i < zscores.len() {
        // crossing: previous bar inside the level, this bar at or beyond
        if zscores[i].abs() >= threshold && zscores[i - 1].abs() < threshold {
            events += 1;
            let mut hit_fixed = None;
            let mut hit_pct = false;
            for (offset, z) in zscores[i..].iter().enumerate() {
                if hit_fixed.is_none() && z.abs() <= REVERSION_BAND {
                    hit_fixed = Some(offset);
                }
                if z.abs() <= pct_band {
                    hit_pct = true;
                }
                if hit_fixed.is_some() && hit_pct {
                    break;
                }
            }
            if let Some(bars) = hit_fixed {
                reverted += 1;
                total_bars += bars as u64;
                // resume after the reversion completes
                i += bars.max(1);
            }
            if hit_pct {
                reverted_pct_band += 1;
            }
        }
        i += 1;
    }

    let avg_bars_to_revert = if reverted > 0 {
        total_bars as f64 / reverted as f64
    } else {
        0.0
    };

    ThresholdStats {
        threshold,
        events,
        reverted,
        reverted_pct_band,
        avg_bars_to_revert,
    }
}
