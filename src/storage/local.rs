//! File-backed local store
//!
//! Keeps client-local string values in a single JSON object on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::storage::backend::LocalStore;
use crate::storage::Result;

/// File name used inside the data directory
pub const LOCAL_STORE_FILE: &str = "local_store.json";

pub struct FileLocalStore {
    path: PathBuf,
    // Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl FileLocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read the whole file; a missing or corrupt file reads as empty
    fn load(&self) -> BTreeMap<String, String> {
        match self.load_internal() {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    "Failed to read local store {:?}, treating as empty: {}",
                    self.path,
                    e
                );
                BTreeMap::new()
            }
        }
    }

    fn load_internal(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl LocalStore for FileLocalStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load().remove(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut items = self.load();
        items.insert(key.to_string(), value.to_string());
        self.save(&items)?;
        tracing::debug!("Stored local item '{}'", key);
        Ok(())
    }
}
