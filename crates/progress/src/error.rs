//! Tracker error types.

use proptrack_storage::StoreError;

/// Error type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors that can occur while tracking a propagation run.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Store command failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A stored counter or member could not be parsed
    #[error("corrupt value {value:?} at {key}")]
    CorruptValue {
        /// Key holding the value
        key: String,
        /// Raw stored value
        value: String,
    },

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(String),
}
