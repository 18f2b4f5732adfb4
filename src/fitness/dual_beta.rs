//! Structural vs dynamic hedge ratio
//!
//! The structural beta comes from a long window (up to 90 observations);
//! the dynamic beta from a short window sized at twice the half-life,
//! clamped to 7..=30 observations. Their relative difference (drift) is
//! both a conviction input and an ongoing "is the hedge still valid"
//! signal for open positions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::half_life::HalfLife;
use super::regression;
use super::FitnessError;

/// Bounds for the dynamic estimation window.
const MIN_DYNAMIC_WINDOW: usize = 7;
const MAX_DYNAMIC_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualBeta {
    /// Long-window hedge ratio.
    pub structural: f64,
    /// Short-window hedge ratio (window scaled by half-life).
    pub dynamic: f64,
    /// `|dynamic - structural| / |structural|`.
    pub drift: f64,
    /// R² of the structural regression.
    pub r_squared: f64,
}

/// Window for the dynamic beta: twice the half-life, clamped.
pub fn dynamic_window(half_life: HalfLife) -> usize {
    match half_life.days() {
        Some(d) => ((2.0 * d).round() as usize).clamp(MIN_DYNAMIC_WINDOW, MAX_DYNAMIC_WINDOW),
        None => MAX_DYNAMIC_WINDOW,
    }
}

/// Compute structural and dynamic betas over aligned price series.
pub fn compute(
    p1: &[f64],
    p2: &[f64],
    half_life: HalfLife,
    structural_window: usize,
) -> Result<DualBeta, FitnessError> {
    let len = p1.len().min(p2.len());
    let s_window = structural_window.min(len);
    let s1 = &p1[p1.len() - s_window..];
    let s2 = &p2[p2.len() - s_window..];
    let structural = regression::correlation_and_beta(s1, s2)?;

    let w = dynamic_window(half_life).min(len);
    let d1 = &p1[p1.len() - w..];
    let d2 = &p2[p2.len() - w..];

    // A degenerate short window should not fail the whole evaluation; the
    // hedge simply shows no drift on this cycle.
    let dynamic = match regression::correlation_and_beta(d1, d2) {
        Ok(stats) => stats.beta,
        Err(e) => {
            debug!(window = w, error = %e, "dynamic beta unavailable, using structural");
            structural.beta
        }
    };

    let drift = if structural.beta.abs() > f64::EPSILON {
        (dynamic - structural.beta).abs() / structural.beta.abs()
    } else {
        0.0
    };

    Ok(DualBeta {
        structural: structural.beta,
        dynamic,
        drift,
        r_squared: structural.r_squared,
    })
}
