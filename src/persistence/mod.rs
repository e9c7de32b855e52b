//! Save/load of progress to LocalStorage
//!
//! One JSON blob under [`STORAGE_KEY`]:
//! `{ gameSettings, coins, upgrades: [{key, level, cost}], storeItems: [{key, purchased}] }`.
//! Storage availability is probed once; when it is missing every save is a
//! silent no-op. Loading is tolerant: structurally invalid data is dropped,
//! individual malformed entries are skipped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::economy::{Economy, StoreItemRecord, UpgradeRecord};

/// LocalStorage key of the save blob
pub const STORAGE_KEY: &str = "idleGameSave";
const PROBE_KEY: &str = "__storage_test__";

/// Failure reported by a storage backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No storage at all (private browsing, sandboxed iframe, native build)
    Unavailable,
    /// The write did not fit
    QuotaExceeded,
    Other(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "storage unavailable"),
            StorageError::QuotaExceeded => write!(f, "storage quota exceeded"),
            StorageError::Other(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Why a save or load did not go through
#[derive(Debug, Clone, PartialEq)]
pub enum SaveError {
    StorageUnavailable,
    /// Storage full; the old save was cleared
    QuotaExceeded,
    Serialize(String),
    Parse(String),
    /// Parsed, but not shaped like a save
    InvalidStructure(&'static str),
    Storage(StorageError),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::StorageUnavailable => write!(f, "storage is not available"),
            SaveError::QuotaExceeded => {
                write!(f, "storage quota exceeded, old save data cleared")
            }
            SaveError::Serialize(msg) => write!(f, "could not serialize save: {}", msg),
            SaveError::Parse(msg) => write!(f, "could not parse save: {}", msg),
            SaveError::InvalidStructure(what) => write!(f, "invalid save data: {}", what),
            SaveError::Storage(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<StorageError> for SaveError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable => SaveError::StorageUnavailable,
            StorageError::QuotaExceeded => SaveError::QuotaExceeded,
            other => SaveError::Storage(other),
        }
    }
}

/// Minimal key/value store interface
pub trait StorageBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store for native builds and tests. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
    /// Max total bytes of stored values
    quota: Option<usize>,
    disabled: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// A store that refuses every operation
    pub fn unavailable() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.disabled {
            return Err(StorageError::Unavailable);
        }
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.disabled {
            return Err(StorageError::Unavailable);
        }
        let mut items = self.items.borrow_mut();
        if let Some(quota) = self.quota {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            if others + value.len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if self.disabled {
            return Err(StorageError::Unavailable);
        }
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn open() -> Option<Self> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()?;
        Some(Self { storage })
    }

    fn map_err(err: wasm_bindgen::JsValue) -> StorageError {
        use wasm_bindgen::JsCast;
        match err.dyn_into::<web_sys::DomException>() {
            Ok(ex) if ex.name() == "QuotaExceededError" => StorageError::QuotaExceeded,
            Ok(ex) => StorageError::Other(ex.message()),
            Err(other) => StorageError::Other(format!("{:?}", other)),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl StorageBackend for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.get_item(key).map_err(Self::map_err)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.set_item(key, value).map_err(Self::map_err)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.storage.remove_item(key).map_err(Self::map_err)
    }
}

/// A validated save blob. Entries are kept as raw JSON so each can be
/// applied or skipped on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    pub game_settings: Value,
    pub coins: i64,
    pub upgrades: Vec<Value>,
    pub store_items: Vec<Value>,
}

impl SaveRecord {
    /// Snapshot the economy
    pub fn capture(economy: &Economy) -> Result<Self, SaveError> {
        Ok(Self {
            game_settings: to_json(&economy.serialize())?,
            coins: economy.coins(),
            upgrades: economy
                .upgrades()
                .records()
                .iter()
                .map(to_json)
                .collect::<Result<_, _>>()?,
            store_items: economy
                .store()
                .records()
                .iter()
                .map(to_json)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Check the shape of a parsed blob. `gameSettings` must be an object and
    /// `coins` a number; the lists may be missing.
    pub fn from_value(value: Value) -> Result<Self, SaveError> {
        let Value::Object(mut obj) = value else {
            return Err(SaveError::InvalidStructure("top level is not an object"));
        };
        let game_settings = match obj.remove("gameSettings") {
            Some(v @ Value::Object(_)) => v,
            _ => return Err(SaveError::InvalidStructure("gameSettings missing")),
        };
        let coins = match obj.get("coins") {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.round() as i64))
                .ok_or(SaveError::InvalidStructure("coins out of range"))?,
            _ => return Err(SaveError::InvalidStructure("coins is not a number")),
        };
        let list = |v: Option<Value>| match v {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        Ok(Self {
            game_settings,
            coins,
            upgrades: list(obj.remove("upgrades")),
            store_items: list(obj.remove("storeItems")),
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, SaveError> {
    serde_json::to_value(value).map_err(|e| SaveError::Serialize(e.to_string()))
}

/// Owns the storage backend and knows whether it works
pub struct SaveManager {
    backend: Box<dyn StorageBackend>,
    available: bool,
}

impl fmt::Debug for SaveManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveManager")
            .field("available", &self.available)
            .finish()
    }
}

impl SaveManager {
    /// Wrap a backend, probing it once with a write/remove
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        let available = backend
            .set_item(PROBE_KEY, PROBE_KEY)
            .and_then(|_| backend.remove_item(PROBE_KEY))
            .is_ok();
        if !available {
            log::warn!("Storage is not available. Game progress will not be saved.");
        }
        Self { backend, available }
    }

    /// LocalStorage in the browser, a throwaway in-memory store natively
    #[cfg(target_arch = "wasm32")]
    pub fn browser() -> Self {
        match LocalStorage::open() {
            Some(storage) => Self::new(Box::new(storage)),
            None => Self::new(Box::new(MemoryStorage::unavailable())),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn browser() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Write the economy. A no-op when storage is unavailable. On a quota
    /// error the stored save is cleared.
    pub fn save(&self, economy: &Economy) -> Result<(), SaveError> {
        if !self.available {
            return Ok(());
        }
        let record = SaveRecord::capture(economy)?;
        let json =
            serde_json::to_string(&record).map_err(|e| SaveError::Serialize(e.to_string()))?;

        match self.backend.set_item(STORAGE_KEY, &json) {
            Ok(()) => {
                log::info!("Game saved ({} coins)", record.coins);
                Ok(())
            }
            Err(err) => {
                log::error!("Failed to save game: {}", err);
                if err == StorageError::QuotaExceeded {
                    self.clear();
                }
                Err(err.into())
            }
        }
    }

    /// Read and validate the stored save. Returns `None` if there is none or
    /// it is unusable; unparseable data is removed.
    pub fn load(&self) -> Option<SaveRecord> {
        match self.try_load() {
            Ok(record) => record,
            Err(err) => {
                log::error!("Failed to load save: {}", err);
                if matches!(err, SaveError::Parse(_)) {
                    self.clear();
                }
                None
            }
        }
    }

    fn try_load(&self) -> Result<Option<SaveRecord>, SaveError> {
        if !self.available {
            return Ok(None);
        }
        let Some(json) = self.backend.get_item(STORAGE_KEY)? else {
            return Ok(None);
        };
        let value: Value =
            serde_json::from_str(&json).map_err(|e| SaveError::Parse(e.to_string()))?;
        SaveRecord::from_value(value).map(Some)
    }

    /// Apply a loaded save to the economy. Bad entries are skipped.
    pub fn apply_save(&self, economy: &mut Economy, record: &SaveRecord) {
        economy.deserialize(&record.game_settings);
        // Top-level coins win over the copy inside gameSettings
        economy.change_coins(record.coins - economy.coins(), false);

        let upgrades: Vec<UpgradeRecord> = record
            .upgrades
            .iter()
            .filter_map(|v| match serde_json::from_value(v.clone()) {
                Ok(r) => Some(r),
                Err(e) => {
                    log::warn!("Skipping saved upgrade {}: {}", v, e);
                    None
                }
            })
            .collect();
        economy.restore_upgrades(&upgrades);

        let items: Vec<StoreItemRecord> = record
            .store_items
            .iter()
            .filter_map(|v| match serde_json::from_value(v.clone()) {
                Ok(r) => Some(r),
                Err(e) => {
                    log::warn!("Skipping saved store item {}: {}", v, e);
                    None
                }
            })
            .collect();
        economy.restore_store(&items);

        log::info!(
            "Save applied: {} coins, {} upgrades, {} store items",
            economy.coins(),
            upgrades.len(),
            items.len()
        );
    }

    /// Remove the stored save
    pub fn clear(&self) {
        if !self.available {
            return;
        }
        match self.backend.remove_item(STORAGE_KEY) {
            Ok(()) => log::info!("Cleared save data"),
            Err(err) => log::error!("Failed to clear save data: {}", err),
        }
    }
}
