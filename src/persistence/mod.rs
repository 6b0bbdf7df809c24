//! Balance persistence
//!
//! The only persisted value is the balance, stored as a plain decimal string.
//! Missing or malformed data loads as "nothing stored" and the caller falls
//! back to the initial balance.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

/// LocalStorage key for the balance
pub const BALANCE_STORAGE_KEY: &str = "skyhigh_balance";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage is not available")]
    Unavailable,
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage rejected the write: {0}")]
    Write(String),
}

/// Load/save capability for the balance
pub trait BalanceStore {
    /// Stored balance, `None` when missing or malformed
    fn load(&self) -> Option<f64>;
    fn save(&mut self, balance: f64) -> Result<(), PersistenceError>;
}

/// Parse a stored balance; rejects junk, non-finite and negative values
pub fn parse_balance(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Load the balance or fall back to `initial`
pub fn load_balance(store: &dyn BalanceStore, initial: f64) -> f64 {
    match store.load() {
        Some(balance) => {
            log::info!("Loaded balance {:.2}", balance);
            balance
        }
        None => {
            log::info!("No stored balance, starting with {:.2}", initial);
            initial
        }
    }
}

/// In-memory store; clones share the same slot
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Rc<RefCell<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with raw text (may be malformed)
    pub fn with_raw(text: &str) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(text.to_string()))),
        }
    }

    /// Raw stored text
    pub fn raw(&self) -> Option<String> {
        self.slot.borrow().clone()
    }
}

impl BalanceStore for MemoryStore {
    fn load(&self) -> Option<f64> {
        self.slot.borrow().as_deref().and_then(parse_balance)
    }

    fn save(&mut self, balance: f64) -> Result<(), PersistenceError> {
        *self.slot.borrow_mut() = Some(balance.to_string());
        Ok(())
    }
}

/// Plain-text file store for the native driver
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStore {
    path: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl BalanceStore for FileStore {
    fn load(&self) -> Option<f64> {
        let text = std::fs::read_to_string(&self.path).ok()?;
        let balance = parse_balance(&text);
        if balance.is_none() {
            log::warn!("Ignoring malformed balance in {}", self.path.display());
        }
        balance
    }

    fn save(&mut self, balance: f64) -> Result<(), PersistenceError> {
        std::fs::write(&self.path, balance.to_string())?;
        Ok(())
    }
}

/// Browser LocalStorage store (WASM only)
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct LocalStorageStore {
    key: String,
}

#[cfg(target_arch = "wasm32")]
impl Default for LocalStorageStore {
    fn default() -> Self {
        Self::new(BALANCE_STORAGE_KEY)
    }
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl BalanceStore for LocalStorageStore {
    fn load(&self) -> Option<f64> {
        let storage = Self::storage()?;
        let text = storage.get_item(&self.key).ok()??;
        parse_balance(&text)
    }

    fn save(&mut self, balance: f64) -> Result<(), PersistenceError> {
        let storage = Self::storage().ok_or(PersistenceError::Unavailable)?;
        storage
            .set_item(&self.key, &balance.to_string())
            .map_err(|e| PersistenceError::Write(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_balance() {
        assert_eq!(parse_balance("1050"), Some(1050.0));
        assert_eq!(parse_balance(" 12.5\n"), Some(12.5));
        assert_eq!(parse_balance("abc"), None);
        assert_eq!(parse_balance(""), None);
        assert_eq!(parse_balance("NaN"), None);
        assert_eq!(parse_balance("inf"), None);
        assert_eq!(parse_balance("-20"), None);
    }

    #[test]
    fn test_missing_and_malformed_fall_back() {
        assert_eq!(load_balance(&MemoryStore::new(), 1000.0), 1000.0);
        assert_eq!(load_balance(&MemoryStore::with_raw("{oops"), 1000.0), 1000.0);
        assert_eq!(load_balance(&MemoryStore::with_raw("250.5"), 1000.0), 250.5);
    }

    #[test]
    fn test_memory_store_shares_slot() {
        let store = MemoryStore::new();
        let mut handle = store.clone();
        handle.save(900.0).unwrap();
        assert_eq!(store.load(), Some(900.0));
        assert_eq!(store.raw().as_deref(), Some("900"));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_store_round_trip() {
        let path = std::env::temp_dir().join(format!("skyhigh_balance_{}.txt", std::process::id()));
        let mut store = FileStore::new(&path);
        assert_eq!(store.load(), None);
        store.save(1234.5).unwrap();
        assert_eq!(store.load(), Some(1234.5));
        std::fs::write(&path, "garbage").unwrap();
        assert_eq!(store.load(), None);
        let _ = std::fs::remove_file(&path);
    }
}
