//! Position health scoring
//!
//! Six independent checks, each contributing a signed score in [-2, +2]:
//! z-score trajectory, PnL, correlation level, half-life inflation, Hurst
//! drift, and beta drift. The total maps to four reporting bands. Health
//! never drives transitions; the exit rules look at the raw metrics.

use serde::{Deserialize, Serialize};

use crate::fitness::{HalfLife, HurstEstimate};

const STRONG_MIN: i32 = 7;
const OK_MIN: i32 = 1;
const WEAK_MIN: i32 = -5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthBand {
    Strong,
    Ok,
    Weak,
    Broken,
}

impl std::fmt::Display for HealthBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            HealthBand::Strong => "STRONG",
            HealthBand::Ok => "OK",
            HealthBand::Weak => "WEAK",
            HealthBand::Broken => "BROKEN",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthScore {
    pub score: i32,
    pub band: HealthBand,
}

impl Default for HealthScore {
    fn default() -> Self {
        Self {
            score: 0,
            band: HealthBand::Ok,
        }
    }
}

/// Everything the health check looks at, snapshotted from a position.
#[derive(Debug, Clone, Copy)]
pub struct HealthInputs {
    pub entry_z: f64,
    pub current_z: f64,
    pub pnl: f64,
    pub correlation: f64,
    pub entry_half_life: f64,
    pub current_half_life: HalfLife,
    pub current_hurst: HurstEstimate,
    pub beta_drift: f64,
}

/// Score a position's health.
pub fn score(i: &HealthInputs) -> HealthScore {
    let total = z_trajectory(i.entry_z, i.current_z)
        + pnl_check(i.pnl)
        + correlation_check(i.correlation)
        + half_life_inflation(i.entry_half_life, i.current_half_life)
        + hurst_check(i.current_hurst)
        + drift_check(i.beta_drift);

    let band = if total >= STRONG_MIN {
        HealthBand::Strong
    } else if total >= OK_MIN {
        HealthBand::Ok
    } else if total >= WEAK_MIN {
        HealthBand::Weak
    } else {
        HealthBand::Broken
    };

    HealthScore { score: total, band }
}

fn z_trajectory(entry_z: f64, current_z: f64) -> i32 {
    let ratio = current_z.abs() / entry_z.abs().max(f64::EPSILON);
    if ratio <= 0.5 {
        2
    } else if ratio < 1.0 {
        1
    } else if ratio <= 1.25 {
        -1
    } else {
        -2
    }
}

fn pnl_check(pnl: f64) -> i32 {
    if pnl >= 0.03 {
        2
    } else if pnl > 0.0 {
        1
    } else if pnl > -0.02 {
        -1
    } else {
        -2
    }
}

fn correlation_check(correlation: f64) -> i32 {
    if correlation >= 0.8 {
        2
    } else if correlation >= 0.6 {
        1
    } else if correlation >= 0.5 {
        -1
    } else {
        -2
    }
}

fn half_life_inflation(entry: f64, current: HalfLife) -> i32 {
    match current.days() {
        Some(d) => {
            let ratio = d / entry.max(f64::EPSILON);
            if ratio <= 1.0 {
                2
            } else if ratio <= 1.5 {
                1
            } else if ratio <= 2.0 {
                -1
            } else {
                -2
            }
        }
        // reversion disappeared entirely on the current window
        None => -2,
    }
}

fn hurst_check(h: HurstEstimate) -> i32 {
    if !h.valid {
        -1
    } else if h.exponent < 0.4 {
        2
    } else if h.exponent < 0.5 {
        1
    } else if h.exponent < 0.55 {
        -1
    } else {
        -2
    }
}

fn drift_check(drift: f64) -> i32 {
    if drift < 0.1 {
        2
    } else if drift < 0.2 {
        1
    } else if drift < 0.3 {
        -1
    } else {
        -2
    }
}
