//! Untyped, string-keyed storage for the prefslot settings layer.
//!
//! A settings store maps string keys to [`StoredValue`]s: booleans, numbers,
//! strings, dates, binary blobs and containers of those. Stores know nothing
//! about the typed values built on top of them.
//!
//! # Storage Backends
//!
//! All backends implement the [`SettingsStore`] trait:
//!
//! - [`InMemorySettingsStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileSettingsStore`] -- snapshot file, atomically replaced on every write
//!
//! # Design Rules
//!
//! 1. Single-key operations are atomic; there are no cross-key transactions.
//! 2. A failed write leaves the previous entry in place.
//! 3. Stores are safe for concurrent use from multiple threads.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;
pub mod value;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use file::{FileSettingsStore, FileStoreConfig};
pub use memory::InMemorySettingsStore;
pub use traits::SettingsStore;
pub use value::StoredValue;
