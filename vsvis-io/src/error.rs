//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HDF5 library error.
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// The store could not be opened.
    #[error("cannot open {path}: {reason}")]
    StoreOpen { path: String, reason: String },

    /// No dataset with this name exists in the store.
    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// The store was closed before the read.
    #[error("store {0} is closed")]
    Closed(String),

    /// Arrays that cannot be sliced or joined.
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] vsvis_core::Error),
}

impl From<Error> for vsvis_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::CoreError(inner) => inner,
            Error::StoreOpen { path, reason } => vsvis_core::Error::StoreOpen { path, reason },
            other => vsvis_core::Error::Store(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_core_error() {
        let err: vsvis_core::Error = Error::StoreOpen {
            path: "a.h5".to_string(),
            reason: "missing".to_string(),
        }
        .into();
        assert!(matches!(err, vsvis_core::Error::StoreOpen { .. }));

        let err: vsvis_core::Error = Error::CoreError(vsvis_core::Error::IndexOutOfRange {
            index: -1,
            len: 3,
        })
        .into();
        assert!(matches!(err, vsvis_core::Error::IndexOutOfRange { index: -1, len: 3 }));

        let err: vsvis_core::Error = Error::DatasetNotFound("/x".to_string()).into();
        assert!(matches!(err, vsvis_core::Error::Store(_)));
    }
}
