//! Backing store abstraction.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::{ArrayD, Axis};
use vsvis_core::{DatasetShape, Extent};

use crate::{Error, Result};

/// Read-only store of named n-dimensional numeric datasets.
///
/// Implementations are shared between the UI thread and fetch workers, so
/// every method takes `&self`.
pub trait Store: Send + Sync {
    /// Human readable location of the store, used in messages.
    fn location(&self) -> &str;

    /// Shape of the dataset `name`.
    ///
    /// # Errors
    /// Returns [`Error::DatasetNotFound`] for unknown names and
    /// [`Error::Closed`] after [`close`](Self::close).
    fn shape(&self, name: &str) -> Result<Vec<usize>>;

    /// Reads the part of `name` selected by `extent`, converted to `f64`.
    ///
    /// A slice drops the sliced axis from the result.
    ///
    /// # Errors
    /// Returns [`Error::DatasetNotFound`], [`Error::Closed`], or a read
    /// error when the extent does not fit the dataset.
    fn read(&self, name: &str, extent: Extent) -> Result<ArrayD<f64>>;

    /// Every dataset in the store with its shape, sorted by name.
    ///
    /// # Errors
    /// Returns [`Error::Closed`] after [`close`](Self::close) or a read error.
    fn list_datasets(&self) -> Result<Vec<DatasetShape>>;

    /// Releases the underlying handle. Later reads fail with
    /// [`Error::Closed`].
    fn close(&self);

    /// Returns true until [`close`](Self::close) is called.
    fn is_open(&self) -> bool;
}

/// Selects `extent` of an in-memory array.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] if the axis or offset is out of bounds.
pub fn select(array: &ArrayD<f64>, name: &str, extent: Extent) -> Result<ArrayD<f64>> {
    match extent {
        Extent::Whole => Ok(array.clone()),
        Extent::Slice { axis, offset } => {
            let len = array.shape().get(axis).copied().ok_or_else(|| {
                Error::InvalidFormat(format!("{name} has no axis {axis}"))
            })?;
            if offset >= len {
                return Err(Error::InvalidFormat(format!(
                    "offset {offset} outside axis {axis} of {name} (length {len})"
                )));
            }
            Ok(array.index_axis(Axis(axis), offset).to_owned())
        }
    }
}

/// Store holding its datasets in memory.
#[derive(Debug)]
pub struct MemoryStore {
    location: String,
    datasets: BTreeMap<String, ArrayD<f64>>,
    open: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            datasets: BTreeMap::new(),
            open: AtomicBool::new(true),
        }
    }

    /// Adds or replaces a dataset.
    #[must_use]
    pub fn with_dataset(mut self, name: impl Into<String>, data: ArrayD<f64>) -> Self {
        self.insert(name, data);
        self
    }

    /// Adds or replaces a dataset.
    pub fn insert(&mut self, name: impl Into<String>, data: ArrayD<f64>) {
        self.datasets.insert(name.into(), data);
    }

    fn dataset(&self, name: &str) -> Result<&ArrayD<f64>> {
        if !self.is_open() {
            return Err(Error::Closed(self.location.clone()));
        }
        self.datasets
            .get(name)
            .ok_or_else(|| Error::DatasetNotFound(name.to_string()))
    }
}

impl Store for MemoryStore {
    fn location(&self) -> &str {
        &self.location
    }

    fn shape(&self, name: &str) -> Result<Vec<usize>> {
        Ok(self.dataset(name)?.shape().to_vec())
    }

    fn read(&self, name: &str, extent: Extent) -> Result<ArrayD<f64>> {
        select(self.dataset(name)?, name, extent)
    }

    fn list_datasets(&self) -> Result<Vec<DatasetShape>> {
        if !self.is_open() {
            return Err(Error::Closed(self.location.clone()));
        }
        Ok(self
            .datasets
            .iter()
            .map(|(name, data)| DatasetShape::new(name.clone(), data.shape().to_vec()))
            .collect())
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn stack() -> ArrayD<f64> {
        ArrayD::from_shape_fn(IxDyn(&[3, 2, 2]), |i| (i[0] * 100 + i[1] * 10 + i[2]) as f64)
    }

    #[test]
    fn test_memory_store_slices_along_axis() {
        let store = MemoryStore::default().with_dataset("/image/data", stack());
        assert_eq!(store.shape("/image/data").unwrap(), vec![3, 2, 2]);

        let frame = store
            .read("/image/data", Extent::Slice { axis: 0, offset: 2 })
            .unwrap();
        assert_eq!(frame.shape(), &[2, 2]);
        assert!((frame[[1, 1]] - 211.0).abs() < f64::EPSILON);

        let column = store
            .read("/image/data", Extent::Slice { axis: 2, offset: 1 })
            .unwrap();
        assert_eq!(column.shape(), &[3, 2]);
    }

    #[test]
    fn test_memory_store_errors() {
        let store = MemoryStore::default().with_dataset("/a", stack());
        assert!(matches!(store.shape("/b"), Err(Error::DatasetNotFound(_))));
        assert!(matches!(
            store.read("/a", Extent::Slice { axis: 0, offset: 3 }),
            Err(Error::InvalidFormat(_))
        ));
        assert!(store.read("/a", Extent::Slice { axis: 5, offset: 0 }).is_err());

        store.close();
        assert!(!store.is_open());
        assert!(matches!(store.read("/a", Extent::Whole), Err(Error::Closed(_))));
        assert!(store.list_datasets().is_err());
    }

    #[test]
    fn test_list_datasets_sorted() {
        let store = MemoryStore::default()
            .with_dataset("/predicted/0", stack())
            .with_dataset("/ground_truth/0", stack());
        let names: Vec<_> = store
            .list_datasets()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["/ground_truth/0", "/predicted/0"]);
    }
}
