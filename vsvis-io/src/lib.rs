//! vsvis-io: Backing stores and data sources for vsvis.
//!
//! This crate reads named numeric datasets from HDF5 files (feature
//! `hdf5`) or memory, and exposes them frame by frame through the virtual
//! indices of `vsvis-core`.
//!

mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod source;
pub mod store;

pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use hdf5::Hdf5Store;
pub use source::{CoordinateSource, DataSource};
pub use store::{MemoryStore, Store};
