//! Persistence port
//!
//! CRUD over the four collections the core owns. Every operation is
//! atomic per call: in particular `close_position` must delete the open
//! position and append its history record as one unit, and the bulk
//! watchlist upsert must complete or report failure as a whole.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{HistoryRecord, Position, WatchlistEntry};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

/// A blacklisted instrument: never enters the scan universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub symbol: String,
    pub reason: String,
    pub added_at: DateTime<Utc>,
}

#[async_trait]
pub trait PersistencePort: Send + Sync {
    // -- watchlist, keyed by the canonical pair key --
    async fn upsert_watchlist(&self, entry: &WatchlistEntry) -> Result<(), StoreError>;
    async fn upsert_watchlist_bulk(&self, entries: &[WatchlistEntry]) -> Result<(), StoreError>;
    async fn delete_watchlist(&self, key: &str) -> Result<(), StoreError>;
    async fn list_watchlist(&self) -> Result<Vec<WatchlistEntry>, StoreError>;

    // -- open positions, keyed by the canonical pair key --
    async fn create_position(&self, position: &Position) -> Result<(), StoreError>;
    async fn update_position(&self, position: &Position) -> Result<(), StoreError>;
    /// Delete the open position and append its history record as a unit.
    async fn close_position(&self, key: &str, record: &HistoryRecord) -> Result<(), StoreError>;
    async fn list_positions(&self) -> Result<Vec<Position>, StoreError>;

    // -- history, append-only --
    async fn list_history(&self) -> Result<Vec<HistoryRecord>, StoreError>;

    // -- blacklist --
    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>, StoreError>;
    async fn add_blacklist(&self, entry: &BlacklistEntry) -> Result<(), StoreError>;
}
