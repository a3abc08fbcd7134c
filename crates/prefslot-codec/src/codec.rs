use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Serializer turning values into opaque byte blobs and back.
///
/// Implementations must be deterministic for a given value and must be able
/// to decode everything they encode. Codecs are stateless handles and are
/// shared freely across threads.
pub trait Codec: Send + Sync + 'static {
    /// Short identifier for diagnostics (e.g. `"json"`).
    fn name(&self) -> &'static str;

    /// Encode a value into a byte blob.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode a byte blob into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;
}

/// JSON codec backed by `serde_json`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JsonCodec {
    /// Emit indented output. Only affects encoding.
    pub pretty: bool,
}

impl JsonCodec {
    /// A codec producing compact JSON.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// A codec producing indented JSON.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Compact binary codec backed by `bincode`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(data)?)
    }
}
