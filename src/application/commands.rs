//! Manual command interface
//!
//! Force entry, force exit, and blacklisting map 1:1 onto the monitor's
//! entry/exit primitives: admission control, state-conflict checks, and
//! the PnL math are the monitor's own, never a parallel implementation.
//! User-visible failures come back as short reason strings.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{Direction, PairSymbol};
use crate::monitor::Monitor;
use crate::ports::market_data::MarketDataPort;
use crate::ports::notifier::NotifierPort;
use crate::ports::persistence::{BlacklistEntry, PersistencePort};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Rejected(String),
}

impl CommandError {
    fn rejected(reason: impl std::fmt::Display) -> Self {
        CommandError::Rejected(reason.to_string())
    }
}

/// Parse "ETH/BTC" (or "ETH-BTC") into a pair.
pub fn parse_pair(arg: &str) -> Result<PairSymbol, CommandError> {
    let parts: Vec<&str> = arg.split(['/', '-']).collect();
    match parts.as_slice() {
        [leg1, leg2] if !leg1.is_empty() && !leg2.is_empty() && leg1 != leg2 => {
            Ok(PairSymbol::new(leg1.to_uppercase(), leg2.to_uppercase()))
        }
        _ => Err(CommandError::Rejected(format!(
            "invalid pair '{arg}', expected LEG1/LEG2"
        ))),
    }
}

/// Parse "long" or "short".
pub fn parse_direction(arg: &str) -> Result<Direction, CommandError> {
    match arg.to_lowercase().as_str() {
        "long" => Ok(Direction::Long),
        "short" => Ok(Direction::Short),
        other => Err(CommandError::Rejected(format!(
            "invalid direction '{other}', expected long or short"
        ))),
    }
}

pub struct CommandHandler<M, P, N> {
    monitor: Arc<Monitor<M, P, N>>,
    store: Arc<P>,
}

impl<M, P, N> CommandHandler<M, P, N>
where
    M: MarketDataPort,
    P: PersistencePort,
    N: NotifierPort,
{
    pub fn new(monitor: Arc<Monitor<M, P, N>>, store: Arc<P>) -> Self {
        Self { monitor, store }
    }

    /// Force-enter a pair. Admission rules still apply.
    pub async fn force_enter(
        &self,
        pair_arg: &str,
        direction_arg: &str,
        size: Option<f64>,
    ) -> Result<String, CommandError> {
        let pair = parse_pair(pair_arg)?;
        let direction = parse_direction(direction_arg)?;
        let notional = match size {
            Some(s) if s > 0.0 => Some(
                Decimal::from_f64(s)
                    .ok_or_else(|| CommandError::Rejected(format!("invalid size {s}")))?,
            ),
            Some(s) => return Err(CommandError::Rejected(format!("size must be positive, got {s}"))),
            None => None,
        };

        let position = self
            .monitor
            .force_enter(pair, direction, notional)
            .await
            .map_err(CommandError::rejected)?;

        Ok(format!(
            "entered {} {} at z={:.2} (weights {:.2}/{:.2})",
            position.direction,
            position.pair,
            position.entry_z_score,
            position.long_weight,
            position.short_weight
        ))
    }

    /// Force-exit an open position.
    pub async fn force_exit(&self, pair_arg: &str) -> Result<String, CommandError> {
        let pair = parse_pair(pair_arg)?;
        let record = self
            .monitor
            .force_exit(&pair)
            .await
            .map_err(CommandError::rejected)?;

        Ok(format!(
            "closed {} [{}] pnl={:+.2}% after {:.1}d",
            record.pair,
            record.exit_reason,
            record.total_pnl * 100.0,
            record.days_in_trade
        ))
    }

    /// Blacklist an instrument from future scans.
    pub async fn blacklist(&self, symbol: &str, reason: &str) -> Result<String, CommandError> {
        if symbol.is_empty() {
            return Err(CommandError::Rejected("symbol cannot be empty".to_string()));
        }
        let entry = BlacklistEntry {
            symbol: symbol.to_uppercase(),
            reason: reason.to_string(),
            added_at: Utc::now(),
        };
        self.store
            .add_blacklist(&entry)
            .await
            .map_err(CommandError::rejected)?;
        Ok(format!("blacklisted {} ({})", entry.symbol, entry.reason))
    }
}
