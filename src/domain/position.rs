//! Open positions and the trade lifecycle state machine
//!
//! A position moves `Entered -> PartiallyExited -> Closed`. Closed
//! positions leave the open set entirely and live on as
//! [`super::history::HistoryRecord`]s, so the open-position collection
//! only ever holds the two active states. Entry-time statistics (z-score,
//! threshold, half-life, worst historical divergence) are frozen at open
//! and never touched by the per-cycle refresh.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::health::HealthScore;
use super::pair::PairSymbol;
use crate::fitness::{HalfLife, HurstEstimate, PairFitness};

/// Direction of the first leg of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// A negative z-score means the spread is below its mean: leg 1 is
    /// cheap relative to the hedge, so we go long the first leg.
    pub fn from_entry_z(z: f64) -> Self {
        if z < 0.0 {
            Direction::Long
        } else {
            Direction::Short
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Active lifecycle states. `Closed` is represented by removal from the
/// open set plus a history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    Entered,
    PartiallyExited,
}

/// Why a position (or half of one) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    PartialReversion,
    PartialProfit,
    FullReversion,
    ProfitTarget,
    StopLoss,
    TimeStop,
    CorrelationBreakdown,
    Manual,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExitReason::PartialReversion => "PARTIAL_REVERSION",
            ExitReason::PartialProfit => "PARTIAL_PROFIT",
            ExitReason::FullReversion => "FULL_REVERSION",
            ExitReason::ProfitTarget => "PROFIT_TARGET",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TimeStop => "TIME_STOP",
            ExitReason::CorrelationBreakdown => "CORRELATION_BREAKDOWN",
            ExitReason::Manual => "MANUAL",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("partial exit already taken")]
    PartialAlreadyTaken,

    #[error("invalid hedge ratio: {0}")]
    InvalidBeta(f64),

    #[error("entry prices must be positive")]
    InvalidEntryPrice,
}

/// Leg weights from the hedge ratio: `w1 = 1/(1+|beta|)`,
/// `w2 = |beta|/(1+|beta|)`.
pub fn weights_from_beta(beta: f64) -> Result<(f64, f64), PositionError> {
    let b = beta.abs();
    if !b.is_finite() || b == 0.0 {
        return Err(PositionError::InvalidBeta(beta));
    }
    Ok((1.0 / (1.0 + b), b / (1.0 + b)))
}

/// Everything frozen at the moment of entry.
#[derive(Debug, Clone)]
pub struct EntryTicket {
    pub pair: PairSymbol,
    pub direction: Direction,
    pub beta: f64,
    pub entry_z_score: f64,
    pub entry_threshold: f64,
    /// Half-life at entry, in days. Entry requires a finite value.
    pub entry_half_life: f64,
    pub max_historical_z: f64,
    pub leg1_price: Decimal,
    pub leg2_price: Decimal,
    pub leg1_funding: Decimal,
    pub leg2_funding: Decimal,
    pub notional: Decimal,
}

/// An open pairs position. At most one per pair symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub pair: PairSymbol,
    pub state: PositionState,
    pub direction: Direction,

    pub long_asset: String,
    pub short_asset: String,
    pub long_weight: f64,
    pub short_weight: f64,
    pub long_entry_price: Decimal,
    pub short_entry_price: Decimal,
    pub long_funding_at_entry: Decimal,
    pub short_funding_at_entry: Decimal,
    pub notional: Decimal,

    // frozen at entry
    pub entry_z_score: f64,
    pub entry_threshold: f64,
    pub entry_half_life: f64,
    pub max_historical_z: f64,
    pub opened_at: DateTime<Utc>,

    // recomputed every cycle
    pub current_z: f64,
    pub current_pnl: f64,
    pub current_correlation: f64,
    pub current_half_life: HalfLife,
    pub current_hurst: HurstEstimate,
    pub beta_drift: f64,
    pub max_beta_drift: f64,
    pub health: HealthScore,
    pub updated_at: DateTime<Utc>,

    // partial exit bookkeeping
    pub partial_exit_taken: bool,
    pub partial_exit_pnl: f64,
}

impl Position {
    /// Open a position from an entry ticket.
    pub fn open(ticket: EntryTicket, now: DateTime<Utc>) -> Result<Self, PositionError> {
        if ticket.leg1_price <= Decimal::ZERO || ticket.leg2_price <= Decimal::ZERO {
            return Err(PositionError::InvalidEntryPrice);
        }
        let (w1, w2) = weights_from_beta(ticket.beta)?;

        // Long the first leg means short the second, and vice versa.
        let (long_asset, short_asset, long_weight, short_weight, long_price, short_price, long_funding, short_funding) =
            match ticket.direction {
                Direction::Long => (
                    ticket.pair.leg1.clone(),
                    ticket.pair.leg2.clone(),
                    w1,
                    w2,
                    ticket.leg1_price,
                    ticket.leg2_price,
                    ticket.leg1_funding,
                    ticket.leg2_funding,
                ),
                Direction::Short => (
                    ticket.pair.leg2.clone(),
                    ticket.pair.leg1.clone(),
                    w2,
                    w1,
                    ticket.leg2_price,
                    ticket.leg1_price,
                    ticket.leg2_funding,
                    ticket.leg1_funding,
                ),
            };

        Ok(Self {
            pair: ticket.pair,
            state: PositionState::Entered,
            direction: ticket.direction,
            long_asset,
            short_asset,
            long_weight,
            short_weight,
            long_entry_price: long_price,
            short_entry_price: short_price,
            long_funding_at_entry: long_funding,
            short_funding_at_entry: short_funding,
            notional: ticket.notional,
            entry_z_score: ticket.entry_z_score,
            entry_threshold: ticket.entry_threshold,
            entry_half_life: ticket.entry_half_life,
            max_historical_z: ticket.max_historical_z,
            opened_at: now,
            current_z: ticket.entry_z_score,
            current_pnl: 0.0,
            current_correlation: 1.0,
            current_half_life: HalfLife::Days(ticket.entry_half_life),
            current_hurst: HurstEstimate::insufficient(),
            beta_drift: 0.0,
            max_beta_drift: 0.0,
            health: HealthScore::default(),
            updated_at: now,
            partial_exit_taken: false,
            partial_exit_pnl: 0.0,
        })
    }

    /// Weighted two-leg PnL as a fraction of notional.
    pub fn pnl(&self, long_mark: Decimal, short_mark: Decimal) -> f64 {
        let lr = leg_return(self.long_entry_price, long_mark);
        let sr = leg_return(self.short_entry_price, short_mark);
        self.long_weight * lr - self.short_weight * sr
    }

    /// Fold a fresh fitness snapshot and marks into the running fields.
    pub fn apply_update(&mut self, fitness: &PairFitness, pnl: f64, now: DateTime<Utc>) {
        self.current_z = fitness.z_score;
        self.current_pnl = pnl;
        self.current_correlation = fitness.correlation;
        self.current_half_life = fitness.half_life;
        self.current_hurst = fitness.hurst;
        self.beta_drift = fitness.dual_beta.drift;
        if fitness.dual_beta.drift > self.max_beta_drift {
            self.max_beta_drift = fitness.dual_beta.drift;
        }
        self.updated_at = now;
    }

    /// Close half the position. Fires at most once.
    pub fn take_partial_exit(&mut self, now: DateTime<Utc>) -> Result<(), PositionError> {
        if self.partial_exit_taken || self.state != PositionState::Entered {
            return Err(PositionError::PartialAlreadyTaken);
        }
        self.state = PositionState::PartiallyExited;
        self.partial_exit_taken = true;
        self.partial_exit_pnl = self.current_pnl;
        self.updated_at = now;
        Ok(())
    }

    /// Realized PnL on final close: after a partial exit, half the book
    /// was locked at the partial PnL and half rides to the end.
    pub fn total_pnl_on_close(&self) -> f64 {
        if self.partial_exit_taken {
            0.5 * self.partial_exit_pnl + 0.5 * self.current_pnl
        } else {
            self.current_pnl
        }
    }

    pub fn days_in_trade(&self, now: DateTime<Utc>) -> f64 {
        (now - self.opened_at).num_seconds() as f64 / 86_400.0
    }
}

fn leg_return(entry: Decimal, mark: Decimal) -> f64 {
    let entry = entry.to_f64().unwrap_or(0.0);
    let mark = mark.to_f64().unwrap_or(0.0);
    if entry > 0.0 {
        mark / entry - 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    fn ticket() -> EntryTicket {
        EntryTicket {
            pair: PairSymbol::new("ETH", "BTC"),
            direction: Direction::Long,
            beta: 0.8,
            entry_z_score: -2.2,
            entry_threshold: 2.0,
            entry_half_life: 4.0,
            max_historical_z: 2.8,
            leg1_price: dec!(2000),
            leg2_price: dec!(40000),
            leg1_funding: dec!(0.0001),
            leg2_funding: dec!(0.00005),
            notional: dec!(1000),
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let (w1, w2) = weights_from_beta(0.8).unwrap();
        assert_relative_eq!(w1 + w2, 1.0, epsilon = 1e-12);
        assert_relative_eq!(w1, 1.0 / 1.8, epsilon = 1e-12);
        assert_relative_eq!(w2, 0.8 / 1.8, epsilon = 1e-12);
    }

    #[test]
    fn negative_beta_uses_magnitude() {
        let (w1, w2) = weights_from_beta(-0.5).unwrap();
        assert_relative_eq!(w1, 1.0 / 1.5, epsilon = 1e-12);
        assert_relative_eq!(w2, 0.5 / 1.5, epsilon = 1e-12);
    }

    #[test]
    fn zero_beta_is_rejected() {
        assert!(matches!(weights_from_beta(0.0), Err(PositionError::InvalidBeta(_))));
    }

    #[test]
    fn direction_from_z_sign() {
        assert_eq!(Direction::from_entry_z(-2.1), Direction::Long);
        assert_eq!(Direction::from_entry_z(2.1), Direction::Short);
    }

    #[test]
    fn long_direction_assigns_legs() {
        let p = Position::open(ticket(), Utc::now()).unwrap();
        assert_eq!(p.long_asset, "ETH");
        assert_eq!(p.short_asset, "BTC");
        assert_eq!(p.state, PositionState::Entered);
    }

    #[test]
    fn short_direction_swaps_legs() {
        let mut t = ticket();
        t.direction = Direction::Short;
        t.entry_z_score = 2.2;
        let p = Position::open(t, Utc::now()).unwrap();
        assert_eq!(p.long_asset, "BTC");
        assert_eq!(p.short_asset, "ETH");
        assert_eq!(p.long_entry_price, dec!(40000));
    }

    #[test]
    fn pnl_converging_spread_is_positive() {
        let p = Position::open(ticket(), Utc::now()).unwrap();
        // long leg up 5%, short leg down 2%: both sides contribute
        let pnl = p.pnl(dec!(2100), dec!(39200));
        let expected = p.long_weight * 0.05 - p.short_weight * (-0.02);
        assert_relative_eq!(pnl, expected, epsilon = 1e-9);
        assert!(pnl > 0.0);
    }

    #[test]
    fn partial_exit_fires_once() {
        let mut p = Position::open(ticket(), Utc::now()).unwrap();
        p.current_pnl = 0.031;
        p.take_partial_exit(Utc::now()).unwrap();
        assert_eq!(p.state, PositionState::PartiallyExited);
        assert_relative_eq!(p.partial_exit_pnl, 0.031, epsilon = 1e-12);
        assert!(matches!(
            p.take_partial_exit(Utc::now()),
            Err(PositionError::PartialAlreadyTaken)
        ));
    }

    #[test]
    fn close_blends_partial_and_remaining() {
        let mut p = Position::open(ticket(), Utc::now()).unwrap();
        p.current_pnl = 0.04;
        p.take_partial_exit(Utc::now()).unwrap();
        p.current_pnl = 0.06;
        assert_relative_eq!(p.total_pnl_on_close(), 0.5 * 0.04 + 0.5 * 0.06, epsilon = 1e-12);
    }

    #[test]
    fn close_without_partial_uses_full_pnl() {
        let mut p = Position::open(ticket(), Utc::now()).unwrap();
        p.current_pnl = -0.02;
        assert_relative_eq!(p.total_pnl_on_close(), -0.02, epsilon = 1e-12);
    }

    #[test]
    fn exit_reason_labels_are_screaming_snake() {
        assert_eq!(ExitReason::PartialReversion.to_string(), "PARTIAL_REVERSION");
        assert_eq!(ExitReason::StopLoss.to_string(), "STOP_LOSS");
    }
}
