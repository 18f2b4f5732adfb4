//! Ports Layer - Trait definitions for external collaborators
//!
//! Following hexagonal architecture, these traits abstract everything the
//! core does not own:
//! - Market data (instrument universe, candles, mark prices, funding)
//! - Persistence (watchlist, positions, history, blacklist)
//! - Notifications (fire-and-forget text delivery)
//!
//! `mocks` provides recording in-memory implementations used by the
//! integration tests and the paper wiring.

pub mod market_data;
pub mod mocks;
pub mod notifier;
pub mod persistence;

pub use market_data::{Interval, InstrumentInfo, MarketDataError, MarketDataPort};
pub use notifier::NotifierPort;
pub use persistence::{BlacklistEntry, PersistencePort, StoreError};
