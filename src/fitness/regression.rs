//! Returns regression: correlation, hedge ratio, R²
//!
//! Simple returns are regressed with asset 2 as the regressor, so
//! `beta = Cov(r1, r2) / Var(r2)` is the hedge ratio in units of asset 1
//! per unit of asset 2.

use super::FitnessError;

/// Output of the returns regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionStats {
    /// Pearson correlation in [-1, 1].
    pub correlation: f64,
    /// OLS hedge ratio, asset 1 on asset 2.
    pub beta: f64,
    /// Goodness of fit, correlation squared.
    pub r_squared: f64,
}

/// Simple returns `Δp / p_{t-1}`. Steps with a non-positive previous
/// close are skipped to keep the series finite.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter_map(|w| {
            if w[0] > 0.0 {
                Some((w[1] - w[0]) / w[0])
            } else {
                None
            }
        })
        .collect()
}

/// Correlation and hedge ratio of two aligned price series.
pub fn correlation_and_beta(p1: &[f64], p2: &[f64]) -> Result<RegressionStats, FitnessError> {
    if p1.len() != p2.len() {
        return Err(FitnessError::LengthMismatch(p1.len(), p2.len()));
    }

    let r1 = simple_returns(p1);
    let r2 = simple_returns(p2);
    if r1.len() < 2 || r2.len() < 2 || r1.len() != r2.len() {
        return Err(FitnessError::InsufficientData {
            got: r1.len().min(r2.len()),
            need: 2,
        });
    }

    let n = r1.len() as f64;
    let mean1 = r1.iter().sum::<f64>() / n;
    let mean2 = r2.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var1 = 0.0;
    let mut var2 = 0.0;
    for (x, y) in r1.iter().zip(r2.iter()) {
        let dx = x - mean1;
        let dy = y - mean2;
        covariance += dx * dy;
        var1 += dx * dx;
        var2 += dy * dy;
    }

    if var1 == 0.0 || var2 == 0.0 {
        return Err(FitnessError::DegenerateSeries("zero variance in returns"));
    }

    let correlation = covariance / (var1.sqrt() * var2.sqrt());
    let beta = covariance / var2;

    if !correlation.is_finite() || !beta.is_finite() {
        return Err(FitnessError::DegenerateSeries("non-finite regression output"));
    }

    Ok(RegressionStats {
        correlation,
        beta,
        r_squared: correlation * correlation,
    })
}

/// Lag-1 autocorrelation of a series. Returns 0.0 for a flat series.
pub(crate) fn lag1_autocorrelation(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for i in 0..xs.len() - 1 {
        let dx = xs[i] - mean;
        numerator += dx * (xs[i + 1] - mean);
        denominator += dx * dx;
    }
    // include the last term of the variance sum
    let last = xs[xs.len() - 1] - mean;
    denominator += last * last;

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn returns_of_doubling_series() {
        let r = simple_returns(&[1.0, 2.0, 4.0, 8.0]);
        assert_eq!(r, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn returns_skip_non_positive_prev() {
        let r = simple_returns(&[0.0, 2.0, 4.0]);
        assert_eq!(r, vec![1.0]);
    }

    #[test]
    fn perfect_correlation() {
        let p1 = vec![100.0, 102.0, 101.0, 104.0, 103.0, 106.0];
        // identical return profile, scaled price
        let p2: Vec<f64> = p1.iter().map(|p| p * 0.5).collect();
        let stats = correlation_and_beta(&p1, &p2).unwrap();
        assert_relative_eq!(stats.correlation, 1.0, epsilon = 1e-9);
        assert_relative_eq!(stats.beta, 1.0, epsilon = 1e-9);
        assert_relative_eq!(stats.r_squared, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn anti_correlation() {
        let p1 = vec![100.0, 102.0, 100.0, 102.0, 100.0];
        let p2 = vec![100.0, 98.0, 100.0, 98.0, 100.0];
        let stats = correlation_and_beta(&p1, &p2).unwrap();
        assert!(stats.correlation < -0.99);
    }

    #[test]
    fn beta_scales_with_return_magnitude() {
        // asset1 moves twice as much as asset2 each step
        let p2 = vec![100.0, 101.0, 100.0, 101.5, 100.5, 102.0];
        let p1: Vec<f64> = {
            let mut v = vec![100.0];
            for w in p2.windows(2) {
                let r = (w[1] - w[0]) / w[0];
                let last = *v.last().unwrap();
                v.push(last * (1.0 + 2.0 * r));
            }
            v
        };
        let stats = correlation_and_beta(&p1, &p2).unwrap();
        assert!((stats.beta - 2.0).abs() < 0.05, "beta {}", stats.beta);
    }

    #[test]
    fn flat_series_is_degenerate() {
        let p1 = vec![100.0; 10];
        let p2 = vec![50.0, 51.0, 50.0, 52.0, 51.0, 50.0, 51.0, 52.0, 51.0, 50.0];
        let err = correlation_and_beta(&p1, &p2).unwrap_err();
        assert!(matches!(err, FitnessError::DegenerateSeries(_)));
    }

    #[test]
    fn too_short_is_insufficient() {
        let err = correlation_and_beta(&[1.0, 2.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, FitnessError::InsufficientData { .. }));
    }

    #[test]
    fn lag1_autocorr_of_alternating_series_is_negative() {
        let xs = vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        assert!(lag1_autocorrelation(&xs) < -0.5);
    }

    #[test]
    fn lag1_autocorr_flat_is_zero() {
        assert_eq!(lag1_autocorrelation(&[3.0; 10]), 0.0);
    }
}
