use crate::error::StoreResult;
use crate::value::StoredValue;

/// Untyped, string-keyed settings store.
///
/// All implementations must satisfy these invariants:
/// - A value set under a key is later retrievable by the same process.
/// - Single-key operations are atomic; there are no cross-key transactions.
/// - Concurrent reads and writes from multiple threads are safe.
/// - The store never interprets values -- typing is the caller's concern.
pub trait SettingsStore: Send + Sync {
    /// Read the raw value under `key`.
    ///
    /// Returns `Ok(None)` if no entry exists.
    fn get_raw(&self, key: &str) -> StoreResult<Option<StoredValue>>;

    /// Create or replace the entry under `key`.
    ///
    /// On error the previous entry (if any) is left in place.
    fn set_raw(&self, key: &str, value: StoredValue) -> StoreResult<()>;

    /// Delete the entry under `key`. Returns `true` if it existed.
    fn remove_raw(&self, key: &str) -> StoreResult<bool>;

    /// All keys currently present, sorted.
    fn keys(&self) -> StoreResult<Vec<String>>;

    /// Check whether an entry exists under `key`.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get_raw(key)?.is_some())
    }
}
