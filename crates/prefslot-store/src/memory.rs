//! In-memory settings store for tests and ephemeral use.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::StoreResult;
use crate::traits::SettingsStore;
use crate::value::StoredValue;

/// `HashMap`-based settings store.
///
/// Entries live behind a `RwLock` and are cloned on read. Data is lost when
/// the store is dropped.
pub struct InMemorySettingsStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl InMemorySettingsStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries currently stored.
    ///
    /// Counts through a poisoned lock: every write leaves the map whole.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    pub fn clear(&self) -> StoreResult<()> {
        self.entries.write()?.clear();
        Ok(())
    }
}

impl Default for InMemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn get_raw(&self, key: &str) -> StoreResult<Option<StoredValue>> {
        let map = self.entries.read()?;
        Ok(map.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: StoredValue) -> StoreResult<()> {
        let mut map = self.entries.write()?;
        map.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> StoreResult<bool> {
        let mut map = self.entries.write()?;
        Ok(map.remove(key).is_some())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.entries.read()?;
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        let map = self.entries.read()?;
        Ok(map.contains_key(key))
    }
}

impl std::fmt::Debug for InMemorySettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySettingsStore")
            .field("entry_count", &self.len())
            .finish()
    }
}
