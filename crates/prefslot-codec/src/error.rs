//! Error types for codec operations.

use thiserror::Error;

/// Errors produced while encoding or decoding a settings blob.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON serialization or deserialization failed.
    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bincode serialization or deserialization failed.
    #[error("bincode codec error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Convenience alias used throughout the codec crate.
pub type Result<T> = std::result::Result<T, CodecError>;
