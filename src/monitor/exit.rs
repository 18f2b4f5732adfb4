//! Exit rules
//!
//! The priority ladder, evaluated in order every cycle with the first
//! match winning:
//! 1. partial exit (half reversion or +3% PnL, fires once)
//! 2. final exit after a partial (+5% PnL or full reversion)
//! 3. full exit without a partial (full reversion)
//! 4. stop-loss: |z| beyond max(entry*1.5, historical*1.2, 3.0)
//! 5. time stop: twice the entry half-life
//! 6. correlation breakdown

use chrono::{DateTime, Utc};

use crate::domain::{ExitReason, Position};

use super::MonitorConfig;

/// Outcome of the exit ladder for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    /// Close 50% notionally.
    Partial(ExitReason),
    /// Close the remainder (or the whole position).
    Final(ExitReason),
}

/// The stop level: the larger of "50% beyond entry", "20% beyond the
/// worst historical divergence", and the absolute floor.
pub fn stop_level(position: &Position, cfg: &MonitorConfig) -> f64 {
    (position.entry_z_score.abs() * cfg.stop_entry_multiple)
        .max(position.max_historical_z * cfg.stop_historical_multiple)
        .max(cfg.stop_loss_floor)
}

/// Walk the exit ladder for a refreshed position.
pub fn decide_exit(
    position: &Position,
    exit_threshold: f64,
    cfg: &MonitorConfig,
    now: DateTime<Utc>,
) -> Option<ExitDecision> {
    let az = position.current_z.abs();

    // 1. partial exit, once
    if !position.partial_exit_taken {
        if az <= 0.5 * position.entry_threshold {
            return Some(ExitDecision::Partial(ExitReason::PartialReversion));
        }
        if position.current_pnl >= cfg.partial_exit_pnl {
            return Some(ExitDecision::Partial(ExitReason::PartialProfit));
        }
    }

    if position.partial_exit_taken {
        // 2. final exit after a partial
        if position.current_pnl >= cfg.final_exit_pnl {
            return Some(ExitDecision::Final(ExitReason::ProfitTarget));
        }
        if az <= exit_threshold {
            return Some(ExitDecision::Final(ExitReason::FullReversion));
        }
    } else if az <= exit_threshold {
        // 3. full exit without a partial
        return Some(ExitDecision::Final(ExitReason::FullReversion));
    }

    // 4. stop-loss
    if az >= stop_level(position, cfg) {
        return Some(ExitDecision::Final(ExitReason::StopLoss));
    }

    // 5. time stop
    if position.days_in_trade(now) > position.entry_half_life * cfg.time_stop_half_lives {
        return Some(ExitDecision::Final(ExitReason::TimeStop));
    }

    // 6. correlation breakdown
    if position.current_correlation < cfg.exit_correlation {
        return Some(ExitDecision::Final(ExitReason::CorrelationBreakdown));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, EntryTicket, PairSymbol};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn position(entry_z: f64, threshold: f64, max_hist: f64) -> Position {
        let ticket = EntryTicket {
            pair: PairSymbol::new("ETH", "BTC"),
            direction: Direction::from_entry_z(entry_z),
            beta: 0.8,
            entry_z_score: entry_z,
            entry_threshold: threshold,
            entry_half_life: 4.0,
            max_historical_z: max_hist,
            leg1_price: dec!(2000),
            leg2_price: dec!(40000),
            leg1_funding: dec!(0),
            leg2_funding: dec!(0),
            notional: dec!(1000),
        };
        Position::open(ticket, Utc::now()).unwrap()
    }

    fn cfg() -> MonitorConfig {
        MonitorConfig::default()
    }

    #[test]
    fn holding_position_has_no_exit() {
        let mut p = position(2.2, 2.0, 2.5);
        p.current_z = 1.8;
        p.current_pnl = 0.01;
        p.current_correlation = 0.8;
        assert_eq!(decide_exit(&p, 0.5, &cfg(), Utc::now()), None);
    }

    #[test]
    fn half_reversion_triggers_partial() {
        // entry 2.2 at threshold 2.0: z dropping to 0.9 <= 1.0 fires
        let mut p = position(2.2, 2.0, 2.5);
        p.current_z = 0.9;
        p.current_correlation = 0.8;
        assert_eq!(
            decide_exit(&p, 0.5, &cfg(), Utc::now()),
            Some(ExitDecision::Partial(ExitReason::PartialReversion))
        );
    }

    #[test]
    fn profit_triggers_partial() {
        let mut p = position(2.2, 2.0, 2.5);
        p.current_z = 1.9;
        p.current_pnl = 0.032;
        p.current_correlation = 0.8;
        assert_eq!(
            decide_exit(&p, 0.5, &cfg(), Utc::now()),
            Some(ExitDecision::Partial(ExitReason::PartialProfit))
        );
    }

    #[test]
    fn full_reversion_after_partial_is_final() {
        let mut p = position(2.2, 2.0, 2.5);
        p.current_z = 0.9;
        p.take_partial_exit(Utc::now()).unwrap();
        p.current_z = 0.4;
        p.current_correlation = 0.8;
        assert_eq!(
            decide_exit(&p, 0.5, &cfg(), Utc::now()),
            Some(ExitDecision::Final(ExitReason::FullReversion))
        );
    }

    #[test]
    fn profit_target_after_partial() {
        let mut p = position(2.2, 2.0, 2.5);
        p.current_pnl = 0.035;
        p.take_partial_exit(Utc::now()).unwrap();
        p.current_z = 1.5;
        p.current_pnl = 0.055;
        p.current_correlation = 0.8;
        assert_eq!(
            decide_exit(&p, 0.5, &cfg(), Utc::now()),
            Some(ExitDecision::Final(ExitReason::ProfitTarget))
        );
    }

    #[test]
    fn stop_loss_uses_the_largest_bound() {
        // entry 2.0, hist 2.5: stop = max(3.0, 3.0, 3.0) = 3.0
        let mut p = position(2.0, 2.0, 2.5);
        assert!((stop_level(&p, &cfg()) - 3.0).abs() < 1e-12);
        p.current_z = 3.2;
        p.current_correlation = 0.8;
        assert_eq!(
            decide_exit(&p, 0.5, &cfg(), Utc::now()),
            Some(ExitDecision::Final(ExitReason::StopLoss))
        );
    }

    #[test]
    fn historical_bound_can_dominate() {
        let p = position(2.0, 2.0, 3.5);
        // 3.5 * 1.2 = 4.2 beats both 3.0 and entry*1.5
        assert!((stop_level(&p, &cfg()) - 4.2).abs() < 1e-12);
    }

    #[test]
    fn time_stop_after_two_half_lives() {
        let mut p = position(2.2, 2.0, 2.5);
        p.current_z = 1.8;
        p.current_correlation = 0.8;
        // 4-day half-life: stop after 8 days
        let later = Utc::now() + Duration::days(9);
        assert_eq!(
            decide_exit(&p, 0.5, &cfg(), later),
            Some(ExitDecision::Final(ExitReason::TimeStop))
        );
    }

    #[test]
    fn correlation_breakdown_is_last_resort() {
        let mut p = position(2.2, 2.0, 2.5);
        p.current_z = 1.8;
        p.current_correlation = 0.3;
        assert_eq!(
            decide_exit(&p, 0.5, &cfg(), Utc::now()),
            Some(ExitDecision::Final(ExitReason::CorrelationBreakdown))
        );
    }

    #[test]
    fn partial_outranks_stop_when_profitable() {
        // both partial-profit and correlation breakdown hold; the ladder
        // order makes the partial win
        let mut p = position(2.2, 2.0, 2.5);
        p.current_z = 1.9;
        p.current_pnl = 0.04;
        p.current_correlation = 0.3;
        assert_eq!(
            decide_exit(&p, 0.5, &cfg(), Utc::now()),
            Some(ExitDecision::Partial(ExitReason::PartialProfit))
        );
    }
}
