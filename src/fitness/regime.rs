//! Spread regime classification
//!
//! Diagnostic label derived from the Hurst exponent and half-life. Entry
//! and exit decisions use the underlying metrics directly; the regime is
//! for ranking displays and notifications.

use serde::{Deserialize, Serialize};

use super::half_life::HalfLife;
use super::hurst::HurstEstimate;

const MEAN_REVERTING_HURST: f64 = 0.45;
const TRENDING_HURST: f64 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadRegime {
    MeanReverting,
    RandomWalk,
    Trending,
}

impl std::fmt::Display for SpreadRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SpreadRegime::MeanReverting => "mean-reverting",
            SpreadRegime::RandomWalk => "random-walk",
            SpreadRegime::Trending => "trending",
        };
        write!(f, "{label}")
    }
}

/// Classify the spread regime from the Hurst exponent and half-life.
pub fn classify(hurst: HurstEstimate, half_life: HalfLife) -> SpreadRegime {
    if !hurst.valid {
        return SpreadRegime::RandomWalk;
    }
    if hurst.exponent < MEAN_REVERTING_HURST && half_life.is_finite() {
        SpreadRegime::MeanReverting
    } else if hurst.exponent > TRENDING_HURST {
        SpreadRegime::Trending
    } else {
        SpreadRegime::RandomWalk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_hurst_with_half_life_is_mean_reverting() {
        let r = classify(
            HurstEstimate {
                exponent: 0.3,
                valid: true,
            },
            HalfLife::Days(4.0),
        );
        assert_eq!(r, SpreadRegime::MeanReverting);
    }

    #[test]
    fn low_hurst_without_half_life_is_random_walk() {
        let r = classify(
            HurstEstimate {
                exponent: 0.3,
                valid: true,
            },
            HalfLife::NotMeanReverting,
        );
        assert_eq!(r, SpreadRegime::RandomWalk);
    }

    #[test]
    fn high_hurst_is_trending() {
        let r = classify(
            HurstEstimate {
                exponent: 0.7,
                valid: true,
            },
            HalfLife::Days(4.0),
        );
        assert_eq!(r, SpreadRegime::Trending);
    }

    #[test]
    fn invalid_estimate_defaults_to_random_walk() {
        let r = classify(HurstEstimate::insufficient(), HalfLife::Days(2.0));
        assert_eq!(r, SpreadRegime::RandomWalk);
    }
}
