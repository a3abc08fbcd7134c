use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use prefslot_codec::{Codec, JsonCodec};
use prefslot_store::SettingsStore;
use tracing::debug;

use crate::channel::{ChangeChannel, Subscription};
use crate::config::{DroppedWritePolicy, SlotConfig};
use crate::error::SettingsError;
use crate::strategy::{self, Strategy};
use crate::value::SettingValue;

/// Typed accessor for one key of a [`SettingsStore`].
///
/// `get` and `set` never fail. Reads fall back to the slot's default when
/// the entry is absent, has the wrong shape, or cannot be decoded; failed
/// writes are dropped. Decode, encode and store failures go to the
/// configured [`ErrorReporter`](crate::ErrorReporter).
///
/// Whether the value is stored natively or as an encoded blob follows from
/// `V` alone, see [`SettingValue`].
pub struct TypedStoreSlot<V: SettingValue, C: Codec = JsonCodec> {
    key: String,
    default_value: V,
    store: Arc<dyn SettingsStore>,
    codec: C,
    config: SlotConfig,
    /// Serializes store writes with their emissions.
    write_lock: Mutex<()>,
    channel: OnceLock<ChangeChannel<V>>,
}

impl<V: SettingValue> TypedStoreSlot<V, JsonCodec> {
    /// A slot using the JSON codec and the default configuration.
    pub fn new(key: impl Into<String>, default: V, store: Arc<dyn SettingsStore>) -> Self {
        Self::with_config(key, default, store, SlotConfig::default())
    }

    /// A slot using the JSON codec and the given configuration.
    pub fn with_config(
        key: impl Into<String>,
        default: V,
        store: Arc<dyn SettingsStore>,
        config: SlotConfig,
    ) -> Self {
        Self::with_codec(key, default, store, JsonCodec::new(), config)
    }
}

impl<T: SettingValue> TypedStoreSlot<Option<T>, JsonCodec> {
    /// A slot for an optional value whose default is `None`.
    pub fn optional(key: impl Into<String>, store: Arc<dyn SettingsStore>) -> Self {
        Self::new(key, None, store)
    }
}

impl<V: SettingValue, C: Codec> TypedStoreSlot<V, C> {
    /// A slot with an explicit codec for the encoded path.
    pub fn with_codec(
        key: impl Into<String>,
        default: V,
        store: Arc<dyn SettingsStore>,
        codec: C,
        config: SlotConfig,
    ) -> Self {
        Self {
            key: key.into(),
            default_value: default,
            store,
            codec,
            config,
            write_lock: Mutex::new(()),
            channel: OnceLock::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> &V {
        &self.default_value
    }

    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    /// How values of this slot are stored.
    pub fn strategy(&self) -> Strategy {
        Strategy::of::<V>()
    }

    /// The stored value, or the default.
    ///
    /// Does not touch the change channel.
    pub fn get(&self) -> V {
        match strategy::read::<V, C>(self.store.as_ref(), &self.codec, &self.key) {
            Ok(Some(value)) => value,
            Ok(None) => self.default_value.clone(),
            Err(err) => {
                self.report(&err);
                self.default_value.clone()
            }
        }
    }

    /// Store `value`, then notify observers.
    ///
    /// The store write happens before the notification. If the write fails
    /// it is dropped, the failure is reported, and observers are notified
    /// only under [`DroppedWritePolicy::NotifyIntended`].
    pub fn set(&self, value: V) {
        let failure = {
            let _writes = self.lock_writes();
            match strategy::write(self.store.as_ref(), &self.codec, &self.key, &value) {
                Ok(()) => {
                    debug!(key = %self.key, strategy = %self.strategy(), "setting written");
                    self.notify(value);
                    None
                }
                Err(err) => {
                    self.notify_dropped(value);
                    Some(err)
                }
            }
        };

        if let Some(err) = failure {
            self.report(&err);
        }
    }

    /// Remove the stored entry so the slot reads its default again.
    ///
    /// Observers receive the default as the new value.
    pub fn reset(&self) {
        let failure = {
            let _writes = self.lock_writes();
            match self.store.remove_raw(&self.key) {
                Ok(existed) => {
                    debug!(key = %self.key, existed, "setting reset");
                    self.notify(self.default_value.clone());
                    None
                }
                Err(source) => {
                    self.notify_dropped(self.default_value.clone());
                    Some(SettingsError::Store {
                        key: self.key.clone(),
                        source,
                    })
                }
            }
        };

        if let Some(err) = failure {
            self.report(&err);
        }
    }

    /// `true` if the store holds an entry under this slot's key.
    ///
    /// The entry may still read as the default if it cannot be decoded.
    pub fn has_value(&self) -> bool {
        match self.store.contains(&self.key) {
            Ok(present) => present,
            Err(source) => {
                self.report(&SettingsError::Store {
                    key: self.key.clone(),
                    source,
                });
                false
            }
        }
    }

    /// Subscribe to changes of this slot.
    ///
    /// The first value delivered is the slot's current value, followed by
    /// every value written afterwards, in write order. The change channel is
    /// created on first use.
    pub fn observe(&self) -> Subscription<V> {
        let _writes = self.lock_writes();
        let current = self.get();
        self.channel
            .get_or_init(|| ChangeChannel::new(current.clone()))
            .subscribe_with(current)
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.channel.get().map_or(0, ChangeChannel::observer_count)
    }

    fn notify(&self, value: V) {
        if let Some(channel) = self.channel.get() {
            channel.emit(value);
        }
    }

    fn notify_dropped(&self, intended: V) {
        if self.config.dropped_write == DroppedWritePolicy::NotifyIntended {
            self.notify(intended);
        }
    }

    fn report(&self, err: &SettingsError) {
        if let Some(reporter) = &self.config.reporter {
            reporter.report(err);
        }
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: SettingValue, C: Codec> fmt::Debug for TypedStoreSlot<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedStoreSlot")
            .field("key", &self.key)
            .field("strategy", &self.strategy())
            .field("codec", &self.codec.name())
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ErrorReporter;
    use bytes::Bytes;
    use prefslot_codec::BincodeCodec;
    use prefslot_store::{FileSettingsStore, InMemorySettingsStore, StoreError, StoredValue};
    use serde::{Deserialize, Serialize, Serializer};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u32,
    }

    impl SettingValue for Profile {}

    /// Serializes to an error every time.
    #[derive(Clone, Debug, PartialEq, Deserialize)]
    struct Unencodable(u8);

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refusing to encode"))
        }
    }

    impl SettingValue for Unencodable {}

    /// Store whose writes always fail.
    struct BrokenStore;

    impl SettingsStore for BrokenStore {
        fn get_raw(&self, _key: &str) -> prefslot_store::StoreResult<Option<StoredValue>> {
            Err(StoreError::LockPoisoned("broken".into()))
        }

        fn set_raw(&self, _key: &str, _value: StoredValue) -> prefslot_store::StoreResult<()> {
            Err(StoreError::LockPoisoned("broken".into()))
        }

        fn remove_raw(&self, _key: &str) -> prefslot_store::StoreResult<bool> {
            Err(StoreError::LockPoisoned("broken".into()))
        }

        fn keys(&self) -> prefslot_store::StoreResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn memory() -> Arc<InMemorySettingsStore> {
        Arc::new(InMemorySettingsStore::new())
    }

    fn counting_config() -> (SlotConfig, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let config = SlotConfig::silent().with_reporter(ErrorReporter::new(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        }));
        (config, count)
    }

    // -----------------------------------------------------------------------
    // Reads and writes
    // -----------------------------------------------------------------------

    #[test]
    fn retry_count_scenario() {
        let slot = TypedStoreSlot::new("retry_count", 0i64, memory());
        assert_eq!(slot.get(), 0);

        slot.set(5);
        assert_eq!(slot.get(), 5);

        let mut sub = slot.observe();
        assert_eq!(sub.drain(), vec![5]);

        slot.set(6);
        assert_eq!(sub.drain(), vec![6]);
    }

    #[test]
    fn last_profile_scenario() {
        let store = memory();
        let slot = TypedStoreSlot::new("last_profile", Profile::default(), store.clone());
        assert_eq!(slot.get(), Profile::default());

        let ann = Profile {
            name: "Ann".into(),
            age: 30,
        };
        slot.set(ann.clone());
        assert_eq!(slot.get(), ann);
        assert_eq!(slot.strategy(), Strategy::Encoded);
        assert_eq!(store.get_raw("last_profile").unwrap().unwrap().kind(), "data");
    }

    #[test]
    fn default_on_absence() {
        let store = memory();
        assert!(TypedStoreSlot::new("flag", true, store.clone()).get());
        assert_eq!(
            TypedStoreSlot::new("name", "anon".to_string(), store.clone()).get(),
            "anon"
        );
        assert_eq!(
            TypedStoreSlot::new("sizes", vec![1u8, 2], store).get(),
            vec![1, 2]
        );
    }

    #[test]
    fn native_value_is_held_directly() {
        let store = memory();
        let slot = TypedStoreSlot::new("volume", 0.5f64, store.clone());
        slot.set(0.75);
        assert_eq!(slot.strategy(), Strategy::Native);
        assert_eq!(store.get_raw("volume").unwrap(), Some(StoredValue::Float(0.75)));
    }

    #[test]
    fn native_blob_roundtrip() {
        let slot = TypedStoreSlot::new("avatar", Bytes::new(), memory());
        slot.set(Bytes::from_static(b"\x89PNG"));
        assert_eq!(slot.get(), Bytes::from_static(b"\x89PNG"));
    }

    #[test]
    fn two_slots_share_a_key() {
        let store = memory();
        let writer = TypedStoreSlot::new("shared", 0u32, store.clone());
        let reader = TypedStoreSlot::new("shared", 0u32, store);
        writer.set(12);
        assert_eq!(reader.get(), 12);
    }

    #[test]
    fn wrong_shape_falls_back_silently() {
        let store = memory();
        store.set_raw("count", StoredValue::String("seven".into())).unwrap();
        let (config, reported) = counting_config();

        let slot = TypedStoreSlot::with_config("count", 1u32, store, config);
        assert_eq!(slot.get(), 1);
        assert_eq!(reported.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn corrupt_blob_falls_back_and_reports_once() {
        let store = memory();
        let (config, reported) = counting_config();
        let slot =
            TypedStoreSlot::with_config("last_profile", Profile::default(), store.clone(), config);

        slot.set(Profile {
            name: "Ann".into(),
            age: 30,
        });
        store
            .set_raw("last_profile", StoredValue::Data(Bytes::from_static(b"{{not json")))
            .unwrap();

        assert_eq!(slot.get(), Profile::default());
        assert_eq!(reported.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_envelope_falls_back_without_report() {
        let store = memory();
        store
            .set_raw("last_profile", StoredValue::Data(Bytes::from_static(b"[]")))
            .unwrap();
        let (config, reported) = counting_config();

        let slot = TypedStoreSlot::with_config("last_profile", Profile::default(), store, config);
        assert_eq!(slot.get(), Profile::default());
        assert_eq!(reported.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn encode_failure_drops_write() {
        let store = memory();
        let (config, reported) = counting_config();
        let slot = TypedStoreSlot::with_config("odd", Unencodable(0), store.clone(), config);

        slot.set(Unencodable(3));
        assert_eq!(reported.load(Ordering::SeqCst), 1);
        assert!(!slot.has_value());
        assert!(store.is_empty());
        assert_eq!(slot.get(), Unencodable(0));
    }

    #[test]
    fn optional_slot_defaults_to_none() {
        let store = memory();
        let slot = TypedStoreSlot::<Option<String>>::optional("nickname", store.clone());
        assert_eq!(slot.get(), None);
        assert_eq!(slot.strategy(), Strategy::Encoded);

        slot.set(Some("ace".into()));
        assert_eq!(slot.get(), Some("ace".to_string()));

        slot.set(None);
        assert_eq!(slot.get(), None);
        // An explicit `None` is stored, unlike an absent entry.
        assert!(slot.has_value());
        assert_eq!(
            store.get_raw("nickname").unwrap(),
            Some(StoredValue::Data(Bytes::from_static(b"[null]")))
        );
    }

    #[test]
    fn optional_slot_with_explicit_default() {
        let slot = TypedStoreSlot::new("timeout", Some(30u64), memory());
        assert_eq!(slot.get(), Some(30));
    }

    #[test]
    fn bincode_codec_slot() {
        let store = memory();
        let slot = TypedStoreSlot::with_codec(
            "profiles",
            Vec::<Profile>::new(),
            store,
            BincodeCodec,
            SlotConfig::silent(),
        );
        let profiles = vec![
            Profile {
                name: "a".into(),
                age: 1,
            },
            Profile {
                name: "b".into(),
                age: 2,
            },
        ];
        slot.set(profiles.clone());
        assert_eq!(slot.get(), profiles);
    }

    #[test]
    fn store_failures_are_reported() {
        let (config, reported) = counting_config();
        let slot = TypedStoreSlot::with_config("any", 4u8, Arc::new(BrokenStore), config);

        assert_eq!(slot.get(), 4);
        slot.set(5);
        slot.reset();
        assert!(!slot.has_value());
        assert_eq!(reported.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn reset_restores_default() {
        let slot = TypedStoreSlot::new("theme", "light".to_string(), memory());
        slot.set("dark".into());
        assert!(slot.has_value());

        let mut sub = slot.observe();
        slot.reset();

        assert!(!slot.has_value());
        assert_eq!(slot.get(), "light");
        assert_eq!(sub.drain(), vec!["dark".to_string(), "light".to_string()]);
    }

    #[test]
    fn values_persist_through_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        {
            let store = Arc::new(FileSettingsStore::open(&path).unwrap());
            TypedStoreSlot::new("retry_count", 0i64, store.clone()).set(5);
            TypedStoreSlot::new("last_profile", Profile::default(), store).set(Profile {
                name: "Ann".into(),
                age: 30,
            });
        }

        let store = Arc::new(FileSettingsStore::open(&path).unwrap());
        assert_eq!(TypedStoreSlot::new("retry_count", 0i64, store.clone()).get(), 5);
        assert_eq!(
            TypedStoreSlot::new("last_profile", Profile::default(), store).get(),
            Profile {
                name: "Ann".into(),
                age: 30,
            }
        );
    }

    #[test]
    fn tuple_setting_roundtrip() {
        let slot = TypedStoreSlot::new("pair", (0u32, String::new()), memory());
        assert_eq!(slot.get(), (0, String::new()));
        slot.set((4, "four".into()));
        assert_eq!(slot.get(), (4, "four".to_string()));
        assert_eq!(slot.strategy(), Strategy::Encoded);
    }

    #[test]
    fn non_finite_floats_persist_through_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        {
            let store = Arc::new(FileSettingsStore::open(&path).unwrap());
            TypedStoreSlot::new("theme", String::new(), store.clone()).set("light".into());
            TypedStoreSlot::new("volume", 1.0f64, store.clone()).set(f64::INFINITY);
            TypedStoreSlot::new("gain", 1.0f64, store).set(f64::NAN);
        }

        let store = Arc::new(FileSettingsStore::open(&path).unwrap());
        assert_eq!(TypedStoreSlot::new("theme", String::new(), store.clone()).get(), "light");
        assert_eq!(
            TypedStoreSlot::new("volume", 1.0f64, store.clone()).get(),
            f64::INFINITY
        );
        assert!(TypedStoreSlot::new("gain", 1.0f64, store).get().is_nan());
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    #[test]
    fn get_does_not_create_channel() {
        let slot = TypedStoreSlot::new("k", 1u8, memory());
        slot.set(2);
        assert_eq!(slot.get(), 2);
        assert!(slot.channel.get().is_none());
        assert_eq!(slot.observer_count(), 0);
    }

    #[test]
    fn replay_is_latest_written_value() {
        let slot = TypedStoreSlot::new("k", 0u8, memory());
        slot.set(1);
        slot.set(2);
        let mut sub = slot.observe();
        assert_eq!(sub.drain(), vec![2]);
    }

    #[test]
    fn emission_order_with_replay() {
        let slot = TypedStoreSlot::new("k", 0u8, memory());
        let mut sub = slot.observe();
        slot.set(1);
        slot.set(2);
        slot.set(3);
        assert_eq!(sub.drain(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn replay_tracks_external_writes() {
        let store = memory();
        let slot = TypedStoreSlot::new("k", 0u8, store.clone());
        let mut early = slot.observe();

        // Another slot on the same key moves the stored value.
        TypedStoreSlot::new("k", 0u8, store).set(9);

        let mut late = slot.observe();
        assert_eq!(late.drain(), vec![9]);
        assert_eq!(early.drain(), vec![0]);
    }

    #[test]
    fn dropped_write_is_suppressed_by_default() {
        let slot =
            TypedStoreSlot::with_config("odd", Unencodable(0), memory(), SlotConfig::silent());
        let mut sub = slot.observe();
        slot.set(Unencodable(1));
        assert_eq!(sub.drain(), vec![Unencodable(0)]);
    }

    #[test]
    fn dropped_write_can_notify_intended_value() {
        let config = SlotConfig::silent().with_dropped_write(DroppedWritePolicy::NotifyIntended);
        let slot = TypedStoreSlot::with_config("odd", Unencodable(0), memory(), config);
        let mut sub = slot.observe();
        slot.set(Unencodable(1));
        assert_eq!(sub.drain(), vec![Unencodable(0), Unencodable(1)]);
        assert_eq!(slot.get(), Unencodable(0));
    }

    #[test]
    fn detached_observer_stops_receiving() {
        let slot = TypedStoreSlot::new("k", 0u8, memory());
        let mut sub = slot.observe();
        assert_eq!(slot.observer_count(), 1);

        sub.detach();
        slot.set(1);
        assert_eq!(slot.observer_count(), 0);
        assert_eq!(sub.drain(), vec![0]);
    }

    #[test]
    fn concurrent_writers_end_on_stored_value() {
        let slot = Arc::new(TypedStoreSlot::new("k", 0u32, memory()));
        let mut sub = slot.observe();

        let writers: Vec<_> = (0..4u32)
            .map(|t| {
                let slot = Arc::clone(&slot);
                thread::spawn(move || {
                    for i in 0..50 {
                        slot.set(t * 1_000 + i);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let received = sub.drain();
        assert_eq!(received.len(), 1 + 4 * 50);
        assert_eq!(received.last().copied(), Some(slot.get()));
    }

    #[tokio::test]
    async fn bound_target_follows_slot() {
        struct Counter {
            value: Mutex<u32>,
        }

        let slot = TypedStoreSlot::new("launches", 0u32, memory());
        slot.set(3);
        let counter = Arc::new(Counter {
            value: Mutex::new(0),
        });

        let _binding = slot
            .observe()
            .bind_weak(&counter, |counter, value| {
                *counter.value.lock().unwrap() = value;
            })
            .unwrap();
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(*counter.value.lock().unwrap(), 3);

        slot.set(4);
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(*counter.value.lock().unwrap(), 4);
    }

    #[test]
    fn debug_output() {
        let slot = TypedStoreSlot::new("retry_count", 0i64, memory());
        let text = format!("{slot:?}");
        assert!(text.contains("retry_count"));
        assert!(text.contains("Native"));
        assert!(text.contains("json"));
    }
}
