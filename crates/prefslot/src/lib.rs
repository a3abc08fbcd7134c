//! Typed persistent settings.
//!
//! A [`TypedStoreSlot`] binds one key of an untyped
//! [`SettingsStore`](prefslot_store::SettingsStore) to a Rust type with a
//! default value. Reads never fail: an absent, mismatched or undecodable
//! entry yields the default. Writes are observable through a replay-latest
//! [`Subscription`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use prefslot::TypedStoreSlot;
//! use prefslot_store::InMemorySettingsStore;
//!
//! let store = Arc::new(InMemorySettingsStore::new());
//! let retries = TypedStoreSlot::new("retry_count", 0i64, store);
//! assert_eq!(retries.get(), 0);
//!
//! retries.set(5);
//! let mut changes = retries.observe();
//! retries.set(6);
//! assert_eq!(changes.drain(), vec![5, 6]);
//! ```
//!
//! # Storage strategy
//!
//! Types the store can hold directly (booleans, numbers, strings, dates,
//! [`bytes::Bytes`], and vectors or string-keyed maps of those) are stored
//! natively. Any other [`SettingValue`] is wrapped in a one-element sequence,
//! encoded by the slot's codec and stored as a blob. The choice is made per
//! type at compile time, see [`Strategy`].
//!
//! # Failures
//!
//! Decode, encode and store failures never reach the caller. They go to the
//! slot's [`ErrorReporter`], which logs through `tracing` unless configured
//! otherwise in [`SlotConfig`].

pub mod binding;
pub mod channel;
pub mod config;
pub mod error;
pub mod slot;
pub mod strategy;
pub mod value;

pub use binding::WeakBinding;
pub use channel::{ChangeChannel, Subscription};
pub use config::{DroppedWritePolicy, ErrorReporter, SlotConfig};
pub use error::{Result, SettingsError};
pub use slot::TypedStoreSlot;
pub use strategy::Strategy;
pub use value::{SettingKey, SettingValue};
