//! Typed values and their storage capability.
//!
//! [`SettingValue::NATIVE`] is the capability marker deciding, per type and
//! at compile time, whether a value is held by the store as-is or encoded
//! into a blob. Native types convert to and from [`StoredValue`]; every other
//! type goes through the slot's codec.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use prefslot_store::StoredValue;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A type that can live in a settings slot.
///
/// Application types opt in with an empty impl, which selects the encoded
/// path:
///
/// ```
/// use prefslot::SettingValue;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct WindowLayout {
///     columns: u8,
///     sidebar: bool,
/// }
///
/// impl SettingValue for WindowLayout {}
/// assert!(!WindowLayout::NATIVE);
/// ```
///
/// Containers are native only when their elements are: `Vec<u32>` is stored
/// as an array, `Vec<WindowLayout>` as a single encoded blob. Maps are native
/// when keyed by `String` (see [`SettingKey`]). Tuples, sets, `char`,
/// 128-bit integers, `()` and `Duration` are always encoded.
pub trait SettingValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// `true` if the store can hold this type without encoding.
    const NATIVE: bool = false;

    /// Convert into the store's representation.
    ///
    /// Must return `Some` for native types and `None` otherwise.
    fn to_stored(&self) -> Option<StoredValue> {
        None
    }

    /// Convert from the store's representation.
    ///
    /// Returns `None` when `raw` has a shape this type cannot be read from.
    fn from_stored(_raw: &StoredValue) -> Option<Self> {
        None
    }
}

impl SettingValue for bool {
    const NATIVE: bool = true;

    fn to_stored(&self) -> Option<StoredValue> {
        Some(StoredValue::Bool(*self))
    }

    fn from_stored(raw: &StoredValue) -> Option<Self> {
        match raw {
            StoredValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

// Integers are stored signed or unsigned by type, and read back from either
// integer shape as long as the value fits.
macro_rules! integer_setting {
    ($variant:ident as $wide:ty => $($ty:ty),+) => {
        $(
            impl SettingValue for $ty {
                const NATIVE: bool = true;

                fn to_stored(&self) -> Option<StoredValue> {
                    Some(StoredValue::$variant(*self as $wide))
                }

                fn from_stored(raw: &StoredValue) -> Option<Self> {
                    raw.as_integer().and_then(|v| <$ty>::try_from(v).ok())
                }
            }
        )+
    };
}

integer_setting!(Int as i64 => i8, i16, i32, i64, isize);
integer_setting!(UInt as u64 => u8, u16, u32, u64, usize);

impl SettingValue for f64 {
    const NATIVE: bool = true;

    fn to_stored(&self) -> Option<StoredValue> {
        Some(StoredValue::Float(*self))
    }

    fn from_stored(raw: &StoredValue) -> Option<Self> {
        match raw {
            StoredValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl SettingValue for f32 {
    const NATIVE: bool = true;

    fn to_stored(&self) -> Option<StoredValue> {
        Some(StoredValue::Float(f64::from(*self)))
    }

    fn from_stored(raw: &StoredValue) -> Option<Self> {
        match raw {
            StoredValue::Float(v) => {
                let narrowed = *v as f32;
                // A finite value beyond f32's range would read back as an infinity.
                (narrowed.is_finite() || !v.is_finite()).then_some(narrowed)
            }
            _ => None,
        }
    }
}

impl SettingValue for String {
    const NATIVE: bool = true;

    fn to_stored(&self) -> Option<StoredValue> {
        Some(StoredValue::String(self.clone()))
    }

    fn from_stored(raw: &StoredValue) -> Option<Self> {
        match raw {
            StoredValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl SettingValue for Bytes {
    const NATIVE: bool = true;

    fn to_stored(&self) -> Option<StoredValue> {
        Some(StoredValue::Data(self.clone()))
    }

    fn from_stored(raw: &StoredValue) -> Option<Self> {
        raw.as_data().cloned()
    }
}

impl SettingValue for DateTime<Utc> {
    const NATIVE: bool = true;

    fn to_stored(&self) -> Option<StoredValue> {
        Some(StoredValue::Date(*self))
    }

    fn from_stored(raw: &StoredValue) -> Option<Self> {
        match raw {
            StoredValue::Date(v) => Some(*v),
            _ => None,
        }
    }
}

impl<T: SettingValue> SettingValue for Vec<T> {
    const NATIVE: bool = T::NATIVE;

    fn to_stored(&self) -> Option<StoredValue> {
        if !T::NATIVE {
            return None;
        }
        self.iter()
            .map(T::to_stored)
            .collect::<Option<Vec<_>>>()
            .map(StoredValue::Array)
    }

    fn from_stored(raw: &StoredValue) -> Option<Self> {
        match raw {
            StoredValue::Array(items) if T::NATIVE => items.iter().map(T::from_stored).collect(),
            _ => None,
        }
    }
}

/// A type usable as the key of a map setting.
///
/// Maps are stored natively only when keyed by `String` and holding native
/// values. Any other key type sends the whole map down the encoded path.
pub trait SettingKey: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// `true` for string keys, which the store can hold directly.
    const STRING: bool = false;

    fn as_key(&self) -> Option<&str> {
        None
    }

    fn from_key(_key: &str) -> Option<Self> {
        None
    }
}

impl SettingKey for String {
    const STRING: bool = true;

    fn as_key(&self) -> Option<&str> {
        Some(self.as_str())
    }

    fn from_key(key: &str) -> Option<Self> {
        Some(key.to_string())
    }
}

macro_rules! encoded_key {
    ($($ty:ty),+) => {
        $(impl SettingKey for $ty {})+
    };
}

encoded_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, char);

fn map_to_stored<'a, K, T, I>(entries: I) -> Option<StoredValue>
where
    K: SettingKey,
    T: SettingValue,
    I: Iterator<Item = (&'a K, &'a T)>,
{
    if !(K::STRING && T::NATIVE) {
        return None;
    }
    entries
        .map(|(k, v)| Some((k.as_key()?.to_string(), v.to_stored()?)))
        .collect::<Option<BTreeMap<_, _>>>()
        .map(StoredValue::Map)
}

fn map_from_stored<K, T, M>(raw: &StoredValue) -> Option<M>
where
    K: SettingKey,
    T: SettingValue,
    M: FromIterator<(K, T)>,
{
    match raw {
        StoredValue::Map(entries) if K::STRING && T::NATIVE => entries
            .iter()
            .map(|(k, v)| Some((K::from_key(k)?, T::from_stored(v)?)))
            .collect(),
        _ => None,
    }
}

impl<K: SettingKey + Ord, T: SettingValue> SettingValue for BTreeMap<K, T> {
    const NATIVE: bool = K::STRING && T::NATIVE;

    fn to_stored(&self) -> Option<StoredValue> {
        map_to_stored::<K, T, _>(self.iter())
    }

    fn from_stored(raw: &StoredValue) -> Option<Self> {
        map_from_stored::<K, T, Self>(raw)
    }
}

impl<K: SettingKey + Hash + Eq, T: SettingValue> SettingValue for HashMap<K, T> {
    const NATIVE: bool = K::STRING && T::NATIVE;

    fn to_stored(&self) -> Option<StoredValue> {
        map_to_stored::<K, T, _>(self.iter())
    }

    fn from_stored(raw: &StoredValue) -> Option<Self> {
        map_from_stored::<K, T, Self>(raw)
    }
}

/// Optional values always take the encoded path, so "no value" is stored
/// explicitly and is distinct from an absent entry.
impl<T: SettingValue> SettingValue for Option<T> {}

impl<T: SettingValue + Ord> SettingValue for BTreeSet<T> {}

impl<T: SettingValue + Hash + Eq> SettingValue for HashSet<T> {}

impl SettingValue for char {}
impl SettingValue for i128 {}
impl SettingValue for u128 {}
impl SettingValue for () {}
impl SettingValue for Duration {}

macro_rules! tuple_setting {
    ($(($($name:ident),+)),+) => {
        $(impl<$($name: SettingValue),+> SettingValue for ($($name,)+) {})+
    };
}

tuple_setting!(
    (A),
    (A, B),
    (A, B, C),
    (A, B, C, D),
    (A, B, C, D, E),
    (A, B, C, D, E, F)
);
