//! Log spread and rolling z-score
//!
//! `spread_t = ln(p1_t) - beta * ln(p2_t)`. The z-score standardizes the
//! last spread value against a rolling window, clamped to the available
//! length.

use statrs::statistics::Statistics;

/// Guard against division by a vanishing standard deviation.
const MIN_STD: f64 = 1e-10;

/// Result of a z-score calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScore {
    pub value: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl ZScore {
    /// Magnitude of the deviation in standard deviations.
    pub fn magnitude(&self) -> f64 {
        self.value.abs()
    }
}

/// Log spread of two aligned price series under a hedge ratio.
/// Rows with a non-positive price on either side are skipped.
pub fn log_spread(p1: &[f64], p2: &[f64], beta: f64) -> Vec<f64> {
    p1.iter()
        .zip(p2.iter())
        .filter_map(|(a, b)| {
            if *a > 0.0 && *b > 0.0 {
                Some(a.ln() - beta * b.ln())
            } else {
                None
            }
        })
        .collect()
}

/// Z-score of the last spread value over a rolling window.
///
/// The window is clamped to the series length. Returns `None` when the
/// window standard deviation vanishes (flat spread).
pub fn z_score(spread: &[f64], window: usize) -> Option<ZScore> {
    if spread.is_empty() || window < 2 {
        return None;
    }
    let w = window.min(spread.len());
    let tail = &spread[spread.len() - w..];

    let mean = tail.mean();
    let std_dev = tail.population_std_dev();

    if std_dev < MIN_STD {
        return None;
    }

    let last = *spread.last()?;
    Some(ZScore {
        value: (last - mean) / std_dev,
        mean,
        std_dev,
    })
}

/// Rolling z-score series: one value per step once `window` observations
/// are available. Flat windows contribute 0.0 so the series stays aligned
/// with the input.
pub fn rolling_z_series(spread: &[f64], window: usize) -> Vec<f64> {
    if spread.len() < window || window < 2 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(spread.len() - window + 1);
    for end in window..=spread.len() {
        let z = z_score(&spread[..end], window).map(|z| z.value).unwrap_or(0.0);
        out.push(z);
    }
    out
}
