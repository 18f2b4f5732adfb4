//! Closed-trade archive

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pair::PairSymbol;
use super::position::{Direction, ExitReason, Position};

/// Immutable record of a closed position. Created only by a final exit,
/// never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub pair: PairSymbol,
    pub direction: Direction,
    pub entry_z_score: f64,
    pub exit_z_score: f64,
    pub exit_reason: ExitReason,
    pub total_pnl: f64,
    pub days_in_trade: f64,
    pub partial_exit_taken: bool,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn from_position(position: &Position, reason: ExitReason, closed_at: DateTime<Utc>) -> Self {
        Self {
            pair: position.pair.clone(),
            direction: position.direction,
            entry_z_score: position.entry_z_score,
            exit_z_score: position.current_z,
            exit_reason: reason,
            total_pnl: position.total_pnl_on_close(),
            days_in_trade: position.days_in_trade(closed_at),
            partial_exit_taken: position.partial_exit_taken,
            opened_at: position.opened_at,
            closed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::EntryTicket;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn record_captures_exit_state() {
        let opened = Utc::now();
        let ticket = EntryTicket {
            pair: PairSymbol::new("SOL", "AVAX"),
            direction: Direction::Short,
            beta: 1.2,
            entry_z_score: 2.4,
            entry_threshold: 2.0,
            entry_half_life: 5.0,
            max_historical_z: 3.0,
            leg1_price: dec!(150),
            leg2_price: dec!(30),
            leg1_funding: dec!(0),
            leg2_funding: dec!(0),
            notional: dec!(1000),
        };
        let mut p = Position::open(ticket, opened).unwrap();
        p.current_z = 0.4;
        p.current_pnl = 0.042;

        let closed = opened + Duration::days(3);
        let rec = HistoryRecord::from_position(&p, ExitReason::FullReversion, closed);

        assert_eq!(rec.exit_reason, ExitReason::FullReversion);
        assert_eq!(rec.exit_z_score, 0.4);
        assert_eq!(rec.total_pnl, 0.042);
        assert!((rec.days_in_trade - 3.0).abs() < 1e-9);
        assert!(!rec.partial_exit_taken);
    }
}
