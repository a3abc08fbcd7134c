//! Single-element sequence envelopes.
//!
//! Blob layout is `codec([value])`. Wrapping guarantees the encoder always
//! sees a container at the root, even when the value is a bare scalar.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::Codec;
use crate::error::Result;

/// Encode `value` as a one-element sequence.
pub fn encode_envelope<C, T>(codec: &C, value: &T) -> Result<Vec<u8>>
where
    C: Codec,
    T: Serialize,
{
    codec.encode(std::slice::from_ref(value))
}

/// Decode a blob produced by [`encode_envelope`] and return its element.
///
/// Elements after the first are ignored. A well-formed but empty sequence
/// carries no value and yields `Ok(None)`.
pub fn decode_envelope<C, T>(codec: &C, data: &[u8]) -> Result<Option<T>>
where
    C: Codec,
    T: DeserializeOwned,
{
    let items: Vec<T> = codec.decode(data)?;
    Ok(items.into_iter().next())
}
