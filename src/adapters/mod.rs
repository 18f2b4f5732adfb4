//! Adapters Layer - Concrete implementations of the ports
//!
//! - `store`: JSON-file persistence with atomic writes
//! - `replay`: market data served from a recorded JSON snapshot
//! - `notify`: tracing-backed notification sink
//! - `cli`: command-line argument definitions

pub mod cli;
pub mod notify;
pub mod replay;
pub mod store;

pub use notify::LogNotifier;
pub use replay::ReplayMarketData;
pub use store::JsonStore;
