//! Entry validation
//!
//! All entry conditions are required; the first failure is reported as a
//! short rejection reason. The z-score signal comes from the reactive
//! window, cointegration from the longer structural window (acting on a
//! relationship that is only transiently correlated is the failure mode
//! this split avoids), and a 7-observation z-score must confirm the same
//! sign so we do not enter a signal that has already started reverting.

use thiserror::Error;

use crate::domain::AdmissionReject;
use crate::domain::WatchlistEntry;
use crate::fitness::PairFitness;

use super::MonitorConfig;

/// Why an entry was refused this cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntryReject {
    #[error("signal: |z|={z:.2} below threshold {threshold:.2}")]
    SignalBelowThreshold { z: f64, threshold: f64 },

    #[error("correlation too low: {0:.2}")]
    CorrelationTooLow(f64),

    #[error("not cointegrated on the structural window")]
    NotCointegrated,

    #[error("no finite half-life on this window")]
    HalfLifeUnavailable,

    #[error("half-life too long: {0:.1} days")]
    HalfLifeTooLong(f64),

    #[error("confirmation failed: short-window z={confirm_z:.2}, need |z|>={required:.2} same sign")]
    ConfirmationFailed { confirm_z: f64, required: f64 },

    #[error("spread is trending: hurst={0:.2}")]
    TrendingSpread(f64),

    #[error("poor historical reversion at this level")]
    ReversionWarning,

    #[error("{0}")]
    Admission(#[from] AdmissionReject),
}

/// Validate every signal-side entry condition for a watchlist entry.
///
/// Admission (overlap/capacity) is checked separately against the open
/// set; it shares the same rejection enum so command responses read
/// uniformly.
pub fn validate_entry(
    entry: &WatchlistEntry,
    fitness: &PairFitness,
    confirmation_z: Option<f64>,
    cfg: &MonitorConfig,
) -> Result<(), EntryReject> {
    let z = fitness.z_score;
    if z.abs() < entry.entry_threshold {
        return Err(EntryReject::SignalBelowThreshold {
            z,
            threshold: entry.entry_threshold,
        });
    }

    if fitness.correlation < cfg.min_entry_correlation {
        return Err(EntryReject::CorrelationTooLow(fitness.correlation));
    }

    if !fitness.is_cointegrated {
        return Err(EntryReject::NotCointegrated);
    }

    match fitness.half_life.days() {
        None => return Err(EntryReject::HalfLifeUnavailable),
        Some(d) if d > cfg.max_entry_half_life_days => {
            return Err(EntryReject::HalfLifeTooLong(d));
        }
        Some(_) => {}
    }

    let required = cfg.confirmation_fraction * entry.entry_threshold;
    match confirmation_z {
        Some(cz) if cz.signum() == z.signum() && cz.abs() >= required => {}
        Some(cz) => {
            return Err(EntryReject::ConfirmationFailed {
                confirm_z: cz,
                required,
            });
        }
        None => {
            return Err(EntryReject::ConfirmationFailed {
                confirm_z: 0.0,
                required,
            });
        }
    }

    // an invalid Hurst estimate fails the check, never passes as "unknown"
    if !fitness.hurst.is_mean_reverting() {
        return Err(EntryReject::TrendingSpread(fitness.hurst.exponent));
    }

    if entry.reversion_warning {
        return Err(EntryReject::ReversionWarning);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PairSymbol;
    use crate::fitness::{DualBeta, HalfLife, HurstEstimate, SpreadRegime};
    use chrono::Utc;

    fn passing_fitness() -> PairFitness {
        PairFitness {
            correlation: 0.9,
            beta: 0.8,
            r_squared: 0.81,
            z_score: -2.3,
            is_cointegrated: true,
            adf_stat: -0.4,
            mean_reversion_rate: 0.62,
            half_life: HalfLife::Days(4.0),
            hurst: HurstEstimate {
                exponent: 0.38,
                valid: true,
            },
            dual_beta: DualBeta {
                structural: 0.8,
                dynamic: 0.82,
                drift: 0.025,
                r_squared: 0.81,
            },
            regime: SpreadRegime::MeanReverting,
            conviction: 80.0,
        }
    }

    fn watch_entry(fitness: &PairFitness) -> WatchlistEntry {
        WatchlistEntry::new(
            PairSymbol::new("ETH", "BTC"),
            "l1",
            false,
            2.0,
            2.8,
            false,
            fitness.clone(),
            Utc::now(),
        )
    }

    fn cfg() -> MonitorConfig {
        MonitorConfig::default()
    }

    #[test]
    fn all_conditions_pass() {
        let fitness = passing_fitness();
        let entry = watch_entry(&fitness);
        assert!(validate_entry(&entry, &fitness, Some(-1.9), &cfg()).is_ok());
    }

    #[test]
    fn weak_signal_rejected() {
        let mut fitness = passing_fitness();
        fitness.z_score = -1.2;
        let entry = watch_entry(&fitness);
        assert!(matches!(
            validate_entry(&entry, &fitness, Some(-1.1), &cfg()),
            Err(EntryReject::SignalBelowThreshold { .. })
        ));
    }

    #[test]
    fn threshold_scaling_is_reflexive() {
        // |z| = 1.8 fails at threshold 2.0 and passes once the threshold
        // drops below |z|, with nothing else changing
        let mut fitness = passing_fitness();
        fitness.z_score = -1.8;
        let mut entry = watch_entry(&fitness);
        assert!(matches!(
            validate_entry(&entry, &fitness, Some(-1.6), &cfg()),
            Err(EntryReject::SignalBelowThreshold { .. })
        ));
        entry.entry_threshold = 1.7;
        assert!(validate_entry(&entry, &fitness, Some(-1.6), &cfg()).is_ok());
    }

    #[test]
    fn low_correlation_rejected() {
        let mut fitness = passing_fitness();
        fitness.correlation = 0.5;
        let entry = watch_entry(&fitness);
        assert!(matches!(
            validate_entry(&entry, &fitness, Some(-1.9), &cfg()),
            Err(EntryReject::CorrelationTooLow(_))
        ));
    }

    #[test]
    fn not_cointegrated_rejected() {
        let mut fitness = passing_fitness();
        fitness.is_cointegrated = false;
        let entry = watch_entry(&fitness);
        assert_eq!(
            validate_entry(&entry, &fitness, Some(-1.9), &cfg()),
            Err(EntryReject::NotCointegrated)
        );
    }

    #[test]
    fn missing_half_life_fails_the_check() {
        let mut fitness = passing_fitness();
        fitness.half_life = HalfLife::NotMeanReverting;
        let entry = watch_entry(&fitness);
        assert_eq!(
            validate_entry(&entry, &fitness, Some(-1.9), &cfg()),
            Err(EntryReject::HalfLifeUnavailable)
        );
    }

    #[test]
    fn long_half_life_rejected() {
        let mut fitness = passing_fitness();
        fitness.half_life = HalfLife::Days(45.0);
        let entry = watch_entry(&fitness);
        assert!(matches!(
            validate_entry(&entry, &fitness, Some(-1.9), &cfg()),
            Err(EntryReject::HalfLifeTooLong(_))
        ));
    }

    #[test]
    fn confirmation_must_match_sign() {
        let fitness = passing_fitness();
        let entry = watch_entry(&fitness);
        // opposite sign: the signal already reverted on the short window
        assert!(matches!(
            validate_entry(&entry, &fitness, Some(1.8), &cfg()),
            Err(EntryReject::ConfirmationFailed { .. })
        ));
    }

    #[test]
    fn confirmation_must_reach_eighty_pct() {
        let fitness = passing_fitness();
        let entry = watch_entry(&fitness);
        // 80% of 2.0 is 1.6
        assert!(matches!(
            validate_entry(&entry, &fitness, Some(-1.5), &cfg()),
            Err(EntryReject::ConfirmationFailed { .. })
        ));
        assert!(validate_entry(&entry, &fitness, Some(-1.6), &cfg()).is_ok());
    }

    #[test]
    fn trending_hurst_rejected() {
        let mut fitness = passing_fitness();
        fitness.hurst = HurstEstimate {
            exponent: 0.58,
            valid: true,
        };
        let entry = watch_entry(&fitness);
        assert!(matches!(
            validate_entry(&entry, &fitness, Some(-1.9), &cfg()),
            Err(EntryReject::TrendingSpread(_))
        ));
    }

    #[test]
    fn invalid_hurst_fails_too() {
        let mut fitness = passing_fitness();
        fitness.hurst = HurstEstimate::insufficient();
        let entry = watch_entry(&fitness);
        assert!(matches!(
            validate_entry(&entry, &fitness, Some(-1.9), &cfg()),
            Err(EntryReject::TrendingSpread(_))
        ));
    }

    #[test]
    fn reversion_warning_blocks_entry() {
        let fitness = passing_fitness();
        let mut entry = watch_entry(&fitness);
        entry.reversion_warning = true;
        assert_eq!(
            validate_entry(&entry, &fitness, Some(-1.9), &cfg()),
            Err(EntryReject::ReversionWarning)
        );
    }
}
