//! The untyped value shapes a settings store can hold.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A value as held by a [`SettingsStore`](crate::SettingsStore).
///
/// Stores only understand this closed set of shapes. Containers nest
/// recursively; map keys are always strings. Anything richer has to be
/// encoded into [`StoredValue::Data`] by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredValue {
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    Float(#[serde(with = "float_repr")] f64),
    String(String),
    /// Opaque binary blob.
    Data(Bytes),
    /// Point in time, UTC.
    Date(DateTime<Utc>),
    Array(Vec<StoredValue>),
    Map(BTreeMap<String, StoredValue>),
}

/// Lossless `f64` serialization.
///
/// Human-readable formats have no literal for non-finite numbers (JSON
/// writes them as `null`), so there NaN and the infinities are written as
/// the strings `"NaN"`, `"inf"` and `"-inf"`. Binary formats store the raw
/// `f64`.
mod float_repr {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    const NAN: &str = "NaN";
    const INF: &str = "inf";
    const NEG_INF: &str = "-inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() || !serializer.is_human_readable() {
            return serializer.serialize_f64(*value);
        }
        let text = if value.is_nan() {
            NAN
        } else if value.is_sign_positive() {
            INF
        } else {
            NEG_INF
        };
        serializer.serialize_str(text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(FloatVisitor)
        } else {
            deserializer.deserialize_f64(FloatVisitor)
        }
    }

    struct FloatVisitor;

    impl<'de> Visitor<'de> for FloatVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number or one of \"NaN\", \"inf\", \"-inf\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v {
                NAN => Ok(f64::NAN),
                INF => Ok(f64::INFINITY),
                NEG_INF => Ok(f64::NEG_INFINITY),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }
}

impl StoredValue {
    /// Name of the shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Data(_) => "data",
            Self::Date(_) => "date",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    /// Returns the blob if this is [`StoredValue::Data`].
    pub fn as_data(&self) -> Option<&Bytes> {
        match self {
            Self::Data(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the integer as `i128` if this is either integer shape.
    ///
    /// Wide enough to hold every `Int` and `UInt` value, so callers can
    /// range-check into any narrower integer type.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(i128::from(*v)),
            Self::UInt(v) => Some(i128::from(*v)),
            _ => None,
        }
    }
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Data(v) => write!(f, "<{} bytes>", v.len()),
            Self::Date(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Array(items) => write!(f, "[{} items]", items.len()),
            Self::Map(entries) => write!(f, "{{{} entries}}", entries.len()),
        }
    }
}
