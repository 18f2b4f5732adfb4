//! Quantitative fitness engine
//!
//! Pure, deterministic functions over aligned price series. Everything in
//! this module is side-effect free so the statistics can be unit-tested
//! with literal arrays.
//!
//! The pipeline for a candidate pair:
//! 1. returns regression -> correlation, hedge ratio (beta), R²
//! 2. log spread `ln(p1) - beta*ln(p2)` -> rolling z-score
//! 3. cointegration heuristic, AR(1) half-life, Hurst exponent
//! 4. structural vs dynamic beta (drift)
//! 5. composite conviction score in [0, 100]
//!
//! Statistical edge cases (zero variance, non-finite logs, `phi >= 1`) are
//! converted into typed "unavailable" results at the function boundary and
//! never panic. Callers must treat unavailable metrics as failing the
//! corresponding check.

pub mod cointegration;
pub mod conviction;
pub mod dual_beta;
pub mod half_life;
pub mod hurst;
pub mod regime;
pub mod regression;
pub mod reversion;
pub mod spread;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cointegration::CointegrationResult;
pub use conviction::ConvictionInputs;
pub use dual_beta::DualBeta;
pub use half_life::HalfLife;
pub use hurst::HurstEstimate;
pub use regime::SpreadRegime;
pub use regression::RegressionStats;
pub use reversion::ReversionProfile;
pub use spread::ZScore;

/// Errors raised by the fitness engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitnessError {
    #[error("insufficient data: {got} observations, need at least {need}")]
    InsufficientData { got: usize, need: usize },

    #[error("length mismatch: {0} vs {1} observations")]
    LengthMismatch(usize, usize),

    #[error("degenerate series: {0}")]
    DegenerateSeries(&'static str),
}

/// Tuning knobs for a full pair evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Rolling window for the reactive z-score (observations).
    pub z_window: usize,
    /// Long window for structural beta and cointegration (observations).
    pub structural_window: usize,
    /// Largest block size used in R/S Hurst estimation.
    pub max_rs_lag: usize,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            z_window: 30,
            structural_window: 90,
            max_rs_lag: 20,
        }
    }
}

/// Full fitness snapshot for a candidate pair.
///
/// Recomputed on every evaluation; carries no persistent identity of its
/// own. The watchlist stores the latest snapshot per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairFitness {
    /// Pearson correlation of simple returns, in [-1, 1].
    pub correlation: f64,
    /// Hedge ratio: units of asset 1 per unit of asset 2.
    pub beta: f64,
    /// R² of the returns regression.
    pub r_squared: f64,
    /// Latest rolling z-score of the log spread (0.0 when unavailable).
    pub z_score: f64,
    pub is_cointegrated: bool,
    /// Pseudo-ADF statistic from the cointegration heuristic.
    pub adf_stat: f64,
    /// Fraction of steps where the spread's deviation from mean shrank.
    pub mean_reversion_rate: f64,
    pub half_life: HalfLife,
    pub hurst: HurstEstimate,
    pub dual_beta: DualBeta,
    pub regime: SpreadRegime,
    /// Composite quality score in [0, 100].
    pub conviction: f64,
}

/// Evaluate a candidate pair over two aligned price series.
///
/// `p1` and `p2` must be equal-length, time-aligned closes, oldest first.
/// The z-score uses the reactive window from `cfg`; cointegration,
/// half-life and Hurst use the full (structural) slice handed in.
pub fn evaluate_pair(p1: &[f64], p2: &[f64], cfg: &FitnessConfig) -> Result<PairFitness, FitnessError> {
    if p1.len() != p2.len() {
        return Err(FitnessError::LengthMismatch(p1.len(), p2.len()));
    }

    let reg = regression::correlation_and_beta(p1, p2)?;
    let spread = spread::log_spread(p1, p2, reg.beta);

    // A flat spread has no signal; score zero rather than fail the whole
    // evaluation so the caller can still see the regression stats.
    let z = spread::z_score(&spread, cfg.z_window).map(|z| z.value).unwrap_or(0.0);

    let coint = cointegration::test(&spread);
    let half_life = half_life::estimate(&spread);
    let hurst = hurst::exponent(&spread, cfg.max_rs_lag);
    let dual_beta = dual_beta::compute(p1, p2, half_life, cfg.structural_window)?;
    let regime = regime::classify(hurst, half_life);

    let conviction = conviction::score(&ConvictionInputs {
        correlation: reg.correlation,
        r_squared: reg.r_squared,
        half_life,
        hurst,
        is_cointegrated: coint.is_cointegrated,
        adf_stat: coint.adf_stat,
        beta_drift: dual_beta.drift,
    });

    Ok(PairFitness {
        correlation: reg.correlation,
        beta: reg.beta,
        r_squared: reg.r_squared,
        z_score: z,
        is_cointegrated: coint.is_cointegrated,
        adf_stat: coint.adf_stat,
        mean_reversion_rate: coint.mean_reversion_rate,
        half_life,
        hurst,
        dual_beta,
        regime,
        conviction,
    })
}
