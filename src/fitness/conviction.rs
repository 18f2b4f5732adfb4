//! Composite conviction score
//!
//! Weighted sum over the fitness metrics, clamped to [0, 100]:
//! correlation up to 20 points above a 0.7 floor, R² up to 15, half-life
//! up to 20 (peaking at 3 days or less, zero above 30), Hurst up to 25
//! (peaking below 0.35, zero at 0.55 or more), the cointegration flag
//! worth 15 with a small bonus for a strongly negative ADF statistic, and
//! a beta-drift penalty of up to 10 points.
//!
//! The score is monotonic: non-decreasing in correlation, R² and
//! closeness to the ideal half-life; non-increasing in beta drift.

use super::half_life::HalfLife;
use super::hurst::HurstEstimate;

const CORRELATION_FLOOR: f64 = 0.7;
const IDEAL_HALF_LIFE_DAYS: f64 = 3.0;
const MAX_HALF_LIFE_DAYS: f64 = 30.0;
const IDEAL_HURST: f64 = 0.35;
const MAX_HURST: f64 = 0.55;
const ADF_BONUS_START: f64 = -2.5;
const DRIFT_FULL_PENALTY: f64 = 0.5;

/// Inputs to the conviction score.
#[derive(Debug, Clone, Copy)]
pub struct ConvictionInputs {
    pub correlation: f64,
    pub r_squared: f64,
    pub half_life: HalfLife,
    pub hurst: HurstEstimate,
    pub is_cointegrated: bool,
    pub adf_stat: f64,
    pub beta_drift: f64,
}

/// Composite 0-100 quality score for a candidate pair.
pub fn score(i: &ConvictionInputs) -> f64 {
    let correlation_pts = ((i.correlation - CORRELATION_FLOOR) / (1.0 - CORRELATION_FLOOR))
        .clamp(0.0, 1.0)
        * 20.0;

    let r2_pts = i.r_squared.clamp(0.0, 1.0) * 15.0;

    let half_life_pts = match i.half_life.days() {
        Some(d) if d <= IDEAL_HALF_LIFE_DAYS => 20.0,
        Some(d) if d < MAX_HALF_LIFE_DAYS => {
            20.0 * (1.0 - (d - IDEAL_HALF_LIFE_DAYS) / (MAX_HALF_LIFE_DAYS - IDEAL_HALF_LIFE_DAYS))
        }
        _ => 0.0,
    };

    let hurst_pts = if !i.hurst.valid {
        0.0
    } else if i.hurst.exponent <= IDEAL_HURST {
        25.0
    } else if i.hurst.exponent < MAX_HURST {
        25.0 * (MAX_HURST - i.hurst.exponent) / (MAX_HURST - IDEAL_HURST)
    } else {
        0.0
    };

    let coint_pts = if i.is_cointegrated {
        15.0 + ((ADF_BONUS_START - i.adf_stat) * 2.0).clamp(0.0, 5.0)
    } else {
        0.0
    };

    let drift_penalty = (i.beta_drift / DRIFT_FULL_PENALTY * 10.0).clamp(0.0, 10.0);

    (correlation_pts + r2_pts + half_life_pts + hurst_pts + coint_pts - drift_penalty)
        .clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> ConvictionInputs {
        ConvictionInputs {
            correlation: 0.85,
            r_squared: 0.72,
            half_life: HalfLife::Days(5.0),
            hurst: HurstEstimate {
                exponent: 0.4,
                valid: true,
            },
            is_cointegrated: true,
            adf_stat: -1.0,
            beta_drift: 0.1,
        }
    }

    #[test]
    fn score_is_in_range() {
        let s = score(&base_inputs());
        assert!((0.0..=100.0).contains(&s), "score {s}");
    }

    #[test]
    fn ideal_pair_scores_high() {
        let i = ConvictionInputs {
            correlation: 1.0,
            r_squared: 1.0,
            half_life: HalfLife::Days(2.0),
            hurst: HurstEstimate {
                exponent: 0.3,
                valid: true,
            },
            is_cointegrated: true,
            adf_stat: -5.0,
            beta_drift: 0.0,
        };
        assert_eq!(score(&i), 100.0);
    }

    #[test]
    fn hopeless_pair_scores_zero() {
        let i = ConvictionInputs {
            correlation: 0.2,
            r_squared: 0.04,
            half_life: HalfLife::NotMeanReverting,
            hurst: HurstEstimate {
                exponent: 0.7,
                valid: true,
            },
            is_cointegrated: false,
            adf_stat: 0.0,
            beta_drift: 1.0,
        };
        assert_eq!(score(&i), 0.0);
    }

    #[test]
    fn monotone_in_correlation() {
        let mut lo = base_inputs();
        let mut hi = base_inputs();
        lo.correlation = 0.75;
        hi.correlation = 0.95;
        assert!(score(&hi) >= score(&lo));
    }

    #[test]
    fn monotone_in_r_squared() {
        let mut lo = base_inputs();
        let mut hi = base_inputs();
        lo.r_squared = 0.5;
        hi.r_squared = 0.9;
        assert!(score(&hi) >= score(&lo));
    }

    #[test]
    fn monotone_toward_ideal_half_life() {
        let mut far = base_inputs();
        let mut near = base_inputs();
        far.half_life = HalfLife::Days(25.0);
        near.half_life = HalfLife::Days(4.0);
        assert!(score(&near) > score(&far));
    }

    #[test]
    fn non_increasing_in_beta_drift() {
        let mut lo = base_inputs();
        let mut hi = base_inputs();
        lo.beta_drift = 0.05;
        hi.beta_drift = 0.45;
        assert!(score(&hi) <= score(&lo));
    }

    #[test]
    fn missing_half_life_contributes_nothing() {
        let mut none = base_inputs();
        none.half_life = HalfLife::NotMeanReverting;
        let mut worst_finite = base_inputs();
        worst_finite.half_life = HalfLife::Days(35.0);
        assert_eq!(score(&none), score(&worst_finite));
    }

    #[test]
    fn invalid_hurst_contributes_nothing() {
        let mut invalid = base_inputs();
        invalid.hurst = HurstEstimate::insufficient();
        let mut out_of_band = base_inputs();
        out_of_band.hurst = HurstEstimate {
            exponent: 0.6,
            valid: true,
        };
        assert_eq!(score(&invalid), score(&out_of_band));
    }

    #[test]
    fn adf_bonus_capped_at_five() {
        let mut modest = base_inputs();
        modest.adf_stat = -3.0;
        let mut extreme = base_inputs();
        extreme.adf_stat = -50.0;
        assert!(score(&extreme) - score(&modest) <= 5.0 + 1e-9);
    }
}
