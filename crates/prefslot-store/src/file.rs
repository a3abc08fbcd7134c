//! File-backed settings store.
//!
//! The whole key map is persisted as a single codec-encoded snapshot. Every
//! write re-encodes the map into a temporary file in the target directory
//! and renames it over the previous snapshot, so readers of the file never
//! observe a partially written state.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use prefslot_codec::{Codec, JsonCodec};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::traits::SettingsStore;
use crate::value::StoredValue;

type Entries = BTreeMap<String, StoredValue>;

/// Configuration for a [`FileSettingsStore`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// `fsync` the snapshot before it replaces the previous one.
    pub sync_on_write: bool,
    /// Create missing parent directories when opening the store.
    pub create_dirs: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            create_dirs: true,
        }
    }
}

/// Durable settings store persisting to one snapshot file.
///
/// Reads are served from memory. Writes update memory and the snapshot
/// together under the write lock; if the snapshot cannot be written, the
/// in-memory entry is rolled back and the error returned.
pub struct FileSettingsStore<C: Codec = JsonCodec> {
    path: PathBuf,
    codec: C,
    config: FileStoreConfig,
    entries: RwLock<Entries>,
}

impl FileSettingsStore<JsonCodec> {
    /// Open (or create) a JSON snapshot store at `path` with default config.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(path, JsonCodec::pretty(), FileStoreConfig::default())
    }
}

impl<C: Codec> FileSettingsStore<C> {
    /// Open (or create) a store at `path` using the given codec and config.
    ///
    /// A missing or empty file opens as an empty store. A file that exists
    /// but cannot be decoded is an error.
    pub fn open_with(
        path: impl AsRef<Path>,
        codec: C,
        config: FileStoreConfig,
    ) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if config.create_dirs {
            fs::create_dir_all(snapshot_dir(&path))?;
        }

        let entries = load_snapshot(&path, &codec)?;
        debug!(
            path = %path.display(),
            codec = codec.name(),
            entries = entries.len(),
            "settings store opened"
        );

        Ok(Self {
            path,
            codec,
            config,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the snapshot from disk, replacing the in-memory entries.
    ///
    /// Picks up changes written by another store instance on the same file.
    pub fn reload(&self) -> StoreResult<()> {
        let fresh = load_snapshot(&self.path, &self.codec)?;
        *self.entries.write()? = fresh;
        Ok(())
    }

    fn save(&self, entries: &Entries) -> StoreResult<()> {
        let bytes = self.codec.encode(entries)?;

        let mut tmp = NamedTempFile::new_in(snapshot_dir(&self.path))?;
        tmp.write_all(&bytes)?;
        if self.config.sync_on_write {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "settings snapshot saved");
        Ok(())
    }

    /// Apply `mutate` to the entries and persist; roll back if saving fails.
    fn write_through<R>(
        &self,
        key: &str,
        mutate: impl FnOnce(&mut Entries) -> (Option<StoredValue>, R),
    ) -> StoreResult<R> {
        let mut entries = self.entries.write()?;
        let (previous, result) = mutate(&mut *entries);

        if let Err(err) = self.save(&entries) {
            warn!(key, error = %err, "snapshot write failed, rolling back");
            match previous {
                Some(old) => {
                    entries.insert(key.to_string(), old);
                }
                None => {
                    entries.remove(key);
                }
            }
            return Err(err);
        }
        Ok(result)
    }
}

impl<C: Codec> SettingsStore for FileSettingsStore<C> {
    fn get_raw(&self, key: &str) -> StoreResult<Option<StoredValue>> {
        let entries = self.entries.read()?;
        Ok(entries.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: StoredValue) -> StoreResult<()> {
        self.write_through(key, |entries| {
            (entries.insert(key.to_string(), value), ())
        })
    }

    fn remove_raw(&self, key: &str) -> StoreResult<bool> {
        self.write_through(key, |entries| {
            let previous = entries.remove(key);
            let existed = previous.is_some();
            (previous, existed)
        })
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let entries = self.entries.read()?;
        Ok(entries.keys().cloned().collect())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        let entries = self.entries.read()?;
        Ok(entries.contains_key(key))
    }
}

impl<C: Codec> std::fmt::Debug for FileSettingsStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSettingsStore")
            .field("path", &self.path)
            .field("codec", &self.codec.name())
            .finish()
    }
}

fn snapshot_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn load_snapshot<C: Codec>(path: &Path, codec: &C) -> StoreResult<Entries> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(Entries::new()),
        Ok(bytes) => Ok(codec.decode(&bytes)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Entries::new()),
        Err(err) => Err(err.into()),
    }
}
