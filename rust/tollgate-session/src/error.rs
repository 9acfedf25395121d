use thiserror::Error;
use tollgate_storage::TollgateStorageError;

/// Errors raised while loading or persisting session state.
///
/// Session mutations never surface these to callers; they are logged and the
/// in-memory state stays authoritative.
#[derive(Error, Debug)]
pub enum TollgateSessionError {
    /// The persisted storage backend failed
    #[error("Session storage error: {0}")]
    Storage(#[from] TollgateStorageError),

    /// A persisted value could not be decoded
    #[error("Malformed session value under '{key}': {reason}")]
    Malformed {
        /// The persisted key
        key: String,
        /// Why decoding failed
        reason: String,
    },

    /// A value could not be encoded for persistence
    #[error("Failed to encode session value under '{key}': {reason}")]
    EncodeFailed {
        /// The persisted key
        key: String,
        /// Why encoding failed
        reason: String,
    },
}
