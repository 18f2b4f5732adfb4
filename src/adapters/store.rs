//! JSON-file persistence
//!
//! Each collection lives in its own file under the data directory.
//! Writes go through a temp-file-then-rename so a crash mid-write never
//! leaves a half-serialized collection on disk. A single mutex serializes
//! load-modify-save cycles, which makes `close_position` (delete open +
//! append history) atomic with respect to other store calls.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::{HistoryRecord, Position, WatchlistEntry};
use crate::ports::persistence::{BlacklistEntry, PersistencePort, StoreError};

const WATCHLIST_FILE: &str = "watchlist.json";
const POSITIONS_FILE: &str = "positions.json";
const HISTORY_FILE: &str = "history.json";
const BLACKLIST_FILE: &str = "blacklist.json";

pub struct JsonStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn load<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, StoreError> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| StoreError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let path = self.path(name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl PersistencePort for JsonStore {
    async fn upsert_watchlist(&self, entry: &WatchlistEntry) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap();
        let mut map: HashMap<String, WatchlistEntry> = self.load(WATCHLIST_FILE)?;
        map.insert(entry.key(), entry.clone());
        self.save(WATCHLIST_FILE, &map)
    }

    async fn upsert_watchlist_bulk(&self, entries: &[WatchlistEntry]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap();
        let mut map: HashMap<String, WatchlistEntry> = self.load(WATCHLIST_FILE)?;
        for entry in entries {
            map.insert(entry.key(), entry.clone());
        }
        // one write for the whole batch
        self.save(WATCHLIST_FILE, &map)
    }

    async fn delete_watchlist(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap();
        let mut map: HashMap<String, WatchlistEntry> = self.load(WATCHLIST_FILE)?;
        map.remove(key);
        self.save(WATCHLIST_FILE, &map)
    }

    async fn list_watchlist(&self) -> Result<Vec<WatchlistEntry>, StoreError> {
        let _guard = self.lock.lock().unwrap();
        let map: HashMap<String, WatchlistEntry> = self.load(WATCHLIST_FILE)?;
        let mut entries: Vec<_> = map.into_values().collect();
        entries.sort_by_key(|e| e.key());
        Ok(entries)
    }

    async fn create_position(&self, position: &Position) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap();
        let mut map: HashMap<String, Position> = self.load(POSITIONS_FILE)?;
        let key = position.pair.key();
        if map.contains_key(&key) {
            return Err(StoreError::Conflict(format!("position {key} already open")));
        }
        map.insert(key, position.clone());
        self.save(POSITIONS_FILE, &map)
    }

    async fn update_position(&self, position: &Position) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap();
        let mut map: HashMap<String, Position> = self.load(POSITIONS_FILE)?;
        let key = position.pair.key();
        if !map.contains_key(&key) {
            return Err(StoreError::NotFound(format!("position {key}")));
        }
        map.insert(key, position.clone());
        self.save(POSITIONS_FILE, &map)
    }

    async fn close_position(&self, key: &str, record: &HistoryRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap();
        let mut positions: HashMap<String, Position> = self.load(POSITIONS_FILE)?;
        positions
            .remove(key)
            .ok_or_else(|| StoreError::NotFound(format!("position {key}")))?;

        let mut history: Vec<HistoryRecord> = self.load(HISTORY_FILE)?;
        history.push(record.clone());

        // history first: replaying an exit is recoverable, losing one is not
        self.save(HISTORY_FILE, &history)?;
        self.save(POSITIONS_FILE, &positions)
    }

    async fn list_positions(&self) -> Result<Vec<Position>, StoreError> {
        let _guard = self.lock.lock().unwrap();
        let map: HashMap<String, Position> = self.load(POSITIONS_FILE)?;
        let mut positions: Vec<_> = map.into_values().collect();
        positions.sort_by_key(|p| p.pair.key());
        Ok(positions)
    }

    async fn list_history(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        let _guard = self.lock.lock().unwrap();
        self.load(HISTORY_FILE)
    }

    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>, StoreError> {
        let _guard = self.lock.lock().unwrap();
        self.load(BLACKLIST_FILE)
    }

    async fn add_blacklist(&self, entry: &BlacklistEntry) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap();
        let mut list: Vec<BlacklistEntry> = self.load(BLACKLIST_FILE)?;
        list.push(entry.clone());
        self.save(BLACKLIST_FILE, &list)
    }
}
