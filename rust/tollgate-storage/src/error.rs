use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TollgateStorageError {
    /// The storage area could not be reached at all (for example, the
    /// browser denies access to `localStorage` in a sandboxed frame)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A value could not be read back from the storage area
    #[error("Failed to read key '{key}': {reason}")]
    ReadFailed {
        /// The key being read
        key: String,
        /// What the backend reported
        reason: String,
    },

    /// A value could not be written (for example, the quota is exhausted)
    #[error("Failed to write key '{key}': {reason}")]
    WriteFailed {
        /// The key being written or removed
        key: String,
        /// What the backend reported
        reason: String,
    },
}
