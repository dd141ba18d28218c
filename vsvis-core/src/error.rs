//! Error types for vsvis-core.

use thiserror::Error;

/// Result type alias for vsvis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for vsvis operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An index could not be built from the given datasets.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A logical index outside `[0, len)` was requested.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// The cache was used before the required setup.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// The backing store could not be opened.
    #[error("cannot open store {path}: {reason}")]
    StoreOpen { path: String, reason: String },

    /// Reading from an open backing store failed.
    #[error("store error: {0}")]
    Store(String),

    /// A marker shape outside the supported set.
    #[error("unsupported marker shape: {0}")]
    UnsupportedShape(String),

    /// Coordinate data that cannot be turned into markers.
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

impl Error {
    /// Returns true for errors the caller is expected to recover from.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::IndexOutOfRange { .. } | Error::UnsupportedShape(_) | Error::Store(_)
        )
    }
}
