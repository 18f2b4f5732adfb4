//! Hurst exponent via rescaled-range analysis
//!
//! R/S analysis runs on the first differences of the spread (the spread is
//! already in log space, so its differences are the log returns of the
//! hedged ratio). For each block size in `10..=min(max_lag, n/2)` the
//! series is split into full blocks; each block contributes its range of
//! cumulative deviations divided by its standard deviation. The slope of
//! `log(R/S)` against `log(lag)` is the exponent, clamped to [0, 1].
//!
//! `H < 0.5` flags mean reversion, `H >= 0.5` random walk or trending.

use serde::{Deserialize, Serialize};

/// Smallest block size used in the R/S regression.
const MIN_LAG: usize = 10;
/// Numerical floor for a block's standard deviation.
const MIN_BLOCK_STD: f64 = 1e-12;

/// R/S Hurst estimate. `valid` is false when the series is too short
/// (fewer than `2 * max_lag` usable differences), in which case the
/// exponent defaults to the random-walk value 0.5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HurstEstimate {
    pub exponent: f64,
    pub valid: bool,
}

impl HurstEstimate {
    pub fn insufficient() -> Self {
        Self {
            exponent: 0.5,
            valid: false,
        }
    }

    /// True only for a valid estimate below the random-walk boundary.
    pub fn is_mean_reverting(&self) -> bool {
        self.valid && self.exponent < 0.5
    }
}

/// Estimate the Hurst exponent of a spread series.
pub fn exponent(spread: &[f64], max_lag: usize) -> HurstEstimate {
    let diffs: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();
    if diffs.len() < 2 * max_lag || max_lag < MIN_LAG {
        return HurstEstimate::insufficient();
    }

    let top_lag = max_lag.min(diffs.len() / 2);
    let mut log_lags = Vec::new();
    let mut log_rs = Vec::new();

    for lag in MIN_LAG..=top_lag {
        if let Some(rs) = mean_rescaled_range(&diffs, lag) {
            log_lags.push((lag as f64).ln());
            log_rs.push(rs.ln());
        }
    }

    if log_lags.len() < 2 {
        return HurstEstimate::insufficient();
    }

    // OLS slope of log(R/S) on log(lag)
    let n = log_lags.len() as f64;
    let mean_x = log_lags.iter().sum::<f64>() / n;
    let mean_y = log_rs.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in log_lags.iter().zip(log_rs.iter()) {
        let dx = x - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }

    if den == 0.0 {
        return HurstEstimate::insufficient();
    }

    HurstEstimate {
        exponent: (num / den).clamp(0.0, 1.0),
        valid: true,
    }
}

/// Average R/S over all full blocks of `lag` consecutive differences.
fn mean_rescaled_range(diffs: &[f64], lag: usize) -> Option<f64> {
    let blocks = diffs.len() / lag;
    if blocks == 0 {
        return None;
    }

    let mut sum = 0.0;
    let mut used = 0usize;
    for b in 0..blocks {
        let chunk = &diffs[b * lag..(b + 1) * lag];
        let mean = chunk.iter().sum::<f64>() / lag as f64;

        let mut cum = 0.0;
        let mut max_dev = f64::MIN;
        let mut min_dev = f64::MAX;
        for x in chunk {
            cum += x - mean;
            max_dev = max_dev.max(cum);
            min_dev = min_dev.min(cum);
        }
        let range = max_dev - min_dev;

        let variance = chunk.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / lag as f64;
        let std = variance.sqrt();
        if std > MIN_BLOCK_STD {
            sum += range / std;
            used += 1;
        }
    }

    if used == 0 {
        return None;
    }
    let avg = sum / used as f64;
    if avg > 0.0 {
        Some(avg)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ar1_spread(n: usize, phi: f64) -> Vec<f64> {
        let mut state = 0x9E3779B97F4A7C15u64;
        let mut x = 0.0;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let u = (state >> 11) as f64 / (1u64 << 53) as f64;
            x = phi * x + (u - 0.5);
            out.push(x);
        }
        out
    }

    #[test]
    fn short_series_is_invalid_half() {
        let est = exponent(&[1.0, 2.0, 1.5], 20);
        assert!(!est.valid);
        assert_eq!(est.exponent, 0.5);
        assert!(!est.is_mean_reverting());
    }

    #[test]
    fn mean_reverting_spread_scores_below_half() {
        let spread = ar1_spread(200, 0.3);
        let est = exponent(&spread, 20);
        assert!(est.valid);
        assert!(est.exponent < 0.5, "H = {}", est.exponent);
        assert!(est.is_mean_reverting());
    }

    #[test]
    fn trending_spread_scores_above_half() {
        // persistent increments: d_t = 0.8 d_{t-1} + noise accumulates
        // into a trending level series
        let mut state = 0xB5297A4D2C5F3A11u64;
        let mut d = 0.0_f64;
        let mut level = 0.0_f64;
        let spread: Vec<f64> = (0..200)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let u = (state >> 11) as f64 / (1u64 << 53) as f64;
                d = 0.8 * d + (u - 0.5) * 0.1;
                level += d;
                level
            })
            .collect();
        let est = exponent(&spread, 20);
        assert!(est.valid);
        assert!(est.exponent > 0.5, "H = {}", est.exponent);
    }

    #[test]
    fn scale_invariant_under_price_multiplication() {
        // multiplying prices by a constant shifts the log spread by a
        // constant; differences are unchanged, so H must be identical
        let spread = ar1_spread(160, 0.5);
        let shifted: Vec<f64> = spread.iter().map(|s| s + 3.7).collect();
        let a = exponent(&spread, 20);
        let b = exponent(&shifted, 20);
        assert_relative_eq!(a.exponent, b.exponent, epsilon = 1e-12);
    }

    #[test]
    fn exponent_is_clamped() {
        let spread = ar1_spread(300, 0.9);
        let est = exponent(&spread, 20);
        assert!((0.0..=1.0).contains(&est.exponent));
    }

    #[test]
    fn deterministic_for_same_input() {
        let spread = ar1_spread(200, 0.4);
        let a = exponent(&spread, 20);
        let b = exponent(&spread, 20);
        assert_eq!(a, b);
    }
}
