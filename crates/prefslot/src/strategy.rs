//! Native/encoded dispatch between typed values and the untyped store.
//!
//! Native values are written as their [`StoredValue`] form and read back
//! by shape. Everything else is wrapped in a one-element envelope, encoded
//! by the slot's codec and stored as [`StoredValue::Data`].

use std::fmt;

use bytes::Bytes;
use prefslot_codec::{decode_envelope, encode_envelope, Codec};
use prefslot_store::{SettingsStore, StoredValue};
use tracing::trace;

use crate::error::{Result, SettingsError};
use crate::value::SettingValue;

/// The storage route a value type takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Held by the store as-is.
    Native,
    /// Encoded into a blob by the slot's codec.
    Encoded,
}

impl Strategy {
    /// The route taken by values of type `V`.
    pub const fn of<V: SettingValue>() -> Self {
        if V::NATIVE {
            Self::Native
        } else {
            Self::Encoded
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Encoded => write!(f, "encoded"),
        }
    }
}

/// Read the value under `key`.
///
/// `Ok(None)` means "use the default": the entry is absent, holds a shape
/// that `V` cannot be read from, or is an encoded blob with no element.
/// Decode and store failures are errors.
pub(crate) fn read<V, C>(store: &dyn SettingsStore, codec: &C, key: &str) -> Result<Option<V>>
where
    V: SettingValue,
    C: Codec,
{
    let raw = store.get_raw(key).map_err(|source| SettingsError::Store {
        key: key.to_string(),
        source,
    })?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    if V::NATIVE {
        let value = V::from_stored(&raw);
        if value.is_none() {
            trace!(key, found = raw.kind(), "stored shape does not match setting type");
        }
        return Ok(value);
    }

    let Some(blob) = raw.as_data() else {
        trace!(key, found = raw.kind(), "expected encoded blob");
        return Ok(None);
    };
    decode_envelope(codec, blob).map_err(|source| SettingsError::Decode {
            key: key.to_string(),
            source,
        })
}

/// Write `value` under `key`.
///
/// On error the store is left unchanged.
pub(crate) fn write<V, C>(store: &dyn SettingsStore, codec: &C, key: &str, value: &V) -> Result<()>
where
    V: SettingValue,
    C: Codec,
{
    let raw = match value.to_stored() {
        Some(raw) if V::NATIVE => raw,
        _ => {
            let blob = encode_envelope(codec, value).map_err(|source| SettingsError::Encode {
                key: key.to_string(),
                source,
            })?;
            StoredValue::Data(Bytes::from(blob))
        }
    };

    store.set_raw(key, raw).map_err(|source| SettingsError::Store {
        key: key.to_string(),
        source,
    })
}
