use prefslot_codec::CodecError;

/// Errors from settings store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A lock guarding the store contents was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk snapshot could not be encoded or decoded.
    #[error("snapshot codec error: {0}")]
    Snapshot(#[from] CodecError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned(err.to_string())
    }
}
