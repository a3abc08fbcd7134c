use prefslot_codec::CodecError;
use prefslot_store::StoreError;

/// Failures observed while reading or writing a setting.
///
/// None of these escape a slot's `get`/`set`: they are handed to the slot's
/// [`ErrorReporter`](crate::ErrorReporter) and the operation falls back to the
/// default value or drops the write.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The stored blob could not be decoded into the setting's type.
    #[error("failed to decode setting {key:?}: {source}")]
    Decode { key: String, source: CodecError },

    /// The value could not be encoded for storage; the write was dropped.
    #[error("failed to encode setting {key:?}: {source}")]
    Encode { key: String, source: CodecError },

    /// The underlying store failed to read or write the entry.
    #[error("store access failed for setting {key:?}: {source}")]
    Store { key: String, source: StoreError },

    /// A binding needs a tokio runtime but none is running.
    #[error("no tokio runtime available to drive the binding")]
    NoRuntime,
}

impl SettingsError {
    /// The key of the setting involved, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Decode { key, .. } | Self::Encode { key, .. } | Self::Store { key, .. } => {
                Some(key.as_str())
            }
            Self::NoRuntime => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SettingsError>;
