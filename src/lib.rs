//! pairflow - Statistical-Arbitrage Pairs Engine Library
//!
//! Discovers perpetual-futures pairs whose price spread is statistically
//! mean-reverting, scores their trade quality, and manages a small
//! portfolio of open positions through a complete entry/exit lifecycle.
//!
//! # Modules
//!
//! - `fitness`: Pure quantitative engine (regression, cointegration,
//!   half-life, Hurst, dual beta, conviction, reversion profiling)
//! - `domain`: Core business logic (PairSymbol, Position, WatchlistEntry,
//!   HistoryRecord, admission control, health scoring)
//! - `ports`: Trait abstractions (MarketDataPort, PersistencePort,
//!   NotifierPort) plus recording mocks
//! - `scanner`: Pair discovery and watchlist publication
//! - `monitor`: Trade lifecycle state machine
//! - `adapters`: Concrete implementations (JSON store, replay data, CLI)
//! - `application`: Orchestrator, pacing, command handling
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod fitness;
pub mod monitor;
pub mod ports;
pub mod scanner;
