//! Blob codecs for the prefslot settings layer.
//!
//! Values that a settings store cannot hold natively are turned into opaque
//! byte blobs by a [`Codec`]. Two codecs ship with the crate:
//!
//! - [`JsonCodec`] -- human-readable, the default for slots and file stores
//! - [`BincodeCodec`] -- compact binary encoding
//!
//! # Envelopes
//!
//! Some encoders reject a bare scalar at the document root. Values are
//! therefore always wrapped in a one-element sequence before encoding
//! ([`encode_envelope`]) and unwrapped after decoding ([`decode_envelope`]),
//! so the root of every blob is a container regardless of the value type.

pub mod codec;
pub mod envelope;
pub mod error;

pub use codec::{BincodeCodec, Codec, JsonCodec};
pub use envelope::{decode_envelope, encode_envelope};
pub use error::{CodecError, Result};
