//! AR(1) half-life of mean reversion
//!
//! Primary method regresses the spread on its own lag: the slope `phi`
//! gives `half_life = -ln(2)/ln(phi)` for `0 < phi < 1`. When the levels
//! regression is outside that domain we fall back to the
//! differenced-autocorrelation formula `-ln(2)/ln(1 + p)`, valid for
//! `-1 < p < 0`. Anything else has no finite half-life and is tagged
//! [`HalfLife::NotMeanReverting`] so callers cannot mistake "no value"
//! for zero.

use serde::{Deserialize, Serialize};

use super::regression::lag1_autocorrelation;

/// Half-life of the spread in days, or no finite value on this window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HalfLife {
    Days(f64),
    NotMeanReverting,
}

impl HalfLife {
    pub fn days(&self) -> Option<f64> {
        match self {
            HalfLife::Days(d) => Some(*d),
            HalfLife::NotMeanReverting => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, HalfLife::Days(_))
    }
}

impl std::fmt::Display for HalfLife {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HalfLife::Days(d) => write!(f, "{d:.1}d"),
            HalfLife::NotMeanReverting => write!(f, "n/a"),
        }
    }
}

/// Estimate the half-life of a spread series.
pub fn estimate(spread: &[f64]) -> HalfLife {
    if spread.len() < 3 {
        return HalfLife::NotMeanReverting;
    }

    // AR(1) on levels: slope of spread_t against spread_{t-1}.
    let lagged = &spread[..spread.len() - 1];
    let current = &spread[1..];
    let n = lagged.len() as f64;
    let mean_x = lagged.iter().sum::<f64>() / n;
    let mean_y = current.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (x, y) in lagged.iter().zip(current.iter()) {
        let dx = x - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }

    if denominator > 0.0 {
        let phi = numerator / denominator;
        if phi > 0.0 && phi < 1.0 {
            let hl = -(2.0_f64.ln()) / phi.ln();
            if hl.is_finite() && hl > 0.0 {
                return HalfLife::Days(hl);
            }
        }
    }

    // Fallback: lag-1 autocorrelation of first differences.
    let diffs: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();
    let p = lag1_autocorrelation(&diffs);
    if p > -1.0 && p < 0.0 {
        let hl = -(2.0_f64.ln()) / (1.0 + p).ln();
        if hl.is_finite() && hl > 0.0 {
            return HalfLife::Days(hl);
        }
    }

    HalfLife::NotMeanReverting
}
