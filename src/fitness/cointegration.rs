//! Cointegration heuristic
//!
//! This is an autocorrelation-derived approximation of an Augmented
//! Dickey-Fuller stationarity test, not the exact statistic: we compute
//! the lag-1 autocorrelation `p` of the spread's first differences and
//! form `adf_stat = -p * sqrt(n)`. There are no critical-value tables and
//! the statistic is not a p-value; it is a fast screen that is tested as
//! a heuristic.
//!
//! A pair is flagged cointegrated when `adf_stat < -2.5` OR when the
//! spread both shrinks toward its mean on most steps
//! (`mean_reversion_rate > 0.5`) and the difference autocorrelation is
//! small (`|p| < 0.3`).

use super::regression::lag1_autocorrelation;

/// Pseudo-ADF rejection threshold.
const ADF_THRESHOLD: f64 = -2.5;
/// Minimum fraction of mean-shrinking steps for the reversion branch.
const MIN_REVERSION_RATE: f64 = 0.5;
/// Maximum |autocorrelation| of differences for the reversion branch.
const MAX_DIFF_AUTOCORR: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CointegrationResult {
    /// `-p * sqrt(n)` where `p` is the lag-1 autocorrelation of the
    /// spread's first differences.
    pub adf_stat: f64,
    pub diff_autocorrelation: f64,
    /// Fraction of steps where the deviation from the spread mean shrank.
    pub mean_reversion_rate: f64,
    pub is_cointegrated: bool,
}

impl CointegrationResult {
    fn unavailable() -> Self {
        Self {
            adf_stat: 0.0,
            diff_autocorrelation: 0.0,
            mean_reversion_rate: 0.0,
            is_cointegrated: false,
        }
    }
}

/// Run the cointegration heuristic on a spread series.
pub fn test(spread: &[f64]) -> CointegrationResult {
    if spread.len() < 3 {
        return CointegrationResult::unavailable();
    }

    let diffs: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();
    let n = diffs.len() as f64;
    let p = lag1_autocorrelation(&diffs);
    let adf_stat = -p * n.sqrt();

    let mean = spread.iter().sum::<f64>() / spread.len() as f64;
    let mut shrinking = 0usize;
    for w in spread.windows(2) {
        if (w[1] - mean).abs() < (w[0] - mean).abs() {
            shrinking += 1;
        }
    }
    let mean_reversion_rate = shrinking as f64 / (spread.len() - 1) as f64;

    let is_cointegrated = adf_stat < ADF_THRESHOLD
        || (mean_reversion_rate > MIN_REVERSION_RATE && p.abs() < MAX_DIFF_AUTOCORR);

    CointegrationResult {
        adf_stat,
        diff_autocorrelation: p,
        mean_reversion_rate,
        is_cointegrated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ar1_series(n: usize, phi: f64) -> Vec<f64> {
        let mut state = 88172645463325252u64;
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
    fn short_series_is_not_cointegrated() {
        let r = test(&[1.0, 2.0]);
        assert!(!r.is_cointegrated);
        assert_eq!(r.adf_stat, 0.0);
    }

    /// Repeating decay cycles: jump to an extreme, shrink 10% per step
    /// back toward zero. Almost every step contracts the deviation.
    fn decay_cycle_series(n: usize) -> Vec<f64> {
        let mut s = 0.15_f64;
        let mut restart_sign = -1.0_f64;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            s *= 0.9;
            if s.abs() < 0.01 {
                s = restart_sign * 0.15;
                restart_sign = -restart_sign;
            }
            // small deterministic ripple so no window is flat
            out.push(s + 0.001 * ((i * 7 % 5) as f64 - 2.0) / 2.0);
        }
        out
    }

    #[test]
    fn decaying_spread_is_cointegrated() {
        // deviations shrink on nearly every step and the difference
        // autocorrelation stays small: the reversion branch fires
        let spread = decay_cycle_series(120);
        let r = test(&spread);
        assert!(r.mean_reversion_rate > 0.6, "rate {}", r.mean_reversion_rate);
        assert!(r.diff_autocorrelation.abs() < 0.3, "p {}", r.diff_autocorrelation);
        assert!(r.is_cointegrated);
    }

    #[test]
    fn random_walk_stays_out_of_adf_branch() {
        // phi = 1 is a unit root: differences are white noise, so the
        // pseudo-ADF statistic stays well inside the threshold and the
        // reversion rate hovers near one half.
        let spread = ar1_series(150, 1.0);
        let r = test(&spread);
        assert!(r.adf_stat > ADF_THRESHOLD, "adf {}", r.adf_stat);
        assert!(r.mean_reversion_rate > 0.3 && r.mean_reversion_rate < 0.7);
    }

    #[test]
    fn trending_series_is_not_cointegrated() {
        let spread: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
        let r = test(&spread);
        assert!(!r.is_cointegrated);
        // steady drift away from the mean on the back half
        assert!(r.mean_reversion_rate <= 0.5);
    }

    #[test]
    fn statistic_is_finite_for_constant_series() {
        let r = test(&[2.0; 60]);
        assert!(r.adf_stat.is_finite());
        assert!(!r.is_cointegrated);
    }
}
