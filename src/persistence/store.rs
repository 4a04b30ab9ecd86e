//! Keyed string storage behind a small capability trait.
//!
//! Each subsystem serializes its own blob under a distinct key. The file
//! backend keeps every key in one JSON object and rewrites it atomically.

use super::files::{atomic_write, read_file};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode value for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode value for key '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Key/value string store
pub trait SaveStore {
    fn is_key_present(&self, key: &str) -> Result<bool, StoreError>;
    fn load_string(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save_string(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete_key(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Typed JSON access on top of any [`SaveStore`]
pub trait SaveStoreExt: SaveStore {
    /// Load and decode `key`, returning `default` when the key is absent
    fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError> {
        match self.load_string(key)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
                key: key.to_string(),
                source,
            }),
            None => Ok(default),
        }
    }

    fn save<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.save_string(key, &raw)
    }
}

impl<S: SaveStore + ?Sized> SaveStoreExt for S {}

/// All keys in a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the whole save file
    pub fn clear(&mut self) -> Result<(), StoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .map_err(|e| anyhow::anyhow!("Failed to delete {}: {}", self.path.display(), e))?;
        }
        Ok(())
    }

    fn load_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = read_file(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "save file is corrupt, starting empty");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(map).map_err(|source| StoreError::Encode {
            key: "*".to_string(),
            source,
        })?;
        atomic_write(&self.path, &json)?;
        debug!(path = %self.path.display(), keys = map.len(), "save file written");
        Ok(())
    }
}

impl SaveStore for JsonFileStore {
    fn is_key_present(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.load_map()?.contains_key(key))
    }

    fn load_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load_map()?.remove(key))
    }

    fn save_string(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.load_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn delete_key(&mut self, key: &str) -> Result<(), StoreError> {
        let mut map = self.load_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// In-process store; clones share the same contents
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemoryStore {
    fn is_key_present(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.borrow().contains_key(key))
    }

    fn load_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn save_string(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_key(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
