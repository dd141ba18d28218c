//! Data sources addressed through a virtual index.

use std::sync::Arc;

use log::{debug, info};
use ndarray::{concatenate, Array2, ArrayD, ArrayView2, Axis, Ix2};
use vsvis_core::{
    DatasetIndex, DatasetShape, Extent, FrameCoordinates, FrameSource, GroupIndex, VirtualIndex,
};

use crate::store::Store;
use crate::{Error, Result};

/// Shared handle to a store plus the index used to address it.
///
/// Clones share the store; it is released when the last clone is dropped
/// or when [`close`](Self::close) is called.
#[derive(Clone)]
pub struct DataSource {
    store: Arc<dyn Store>,
    index: Arc<VirtualIndex>,
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("store", &self.store.location())
            .field("len", &self.len())
            .finish()
    }
}

impl DataSource {
    /// Wraps a store with an already built index.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, index: VirtualIndex) -> Self {
        Self {
            store,
            index: Arc::new(index),
        }
    }

    /// Builds a flat index by probing the shapes of `names`.
    ///
    /// # Errors
    /// Returns a store error for unknown datasets and
    /// [`vsvis_core::Error::Configuration`] for inconsistent shapes.
    pub fn flat<S: AsRef<str>>(store: Arc<dyn Store>, names: &[S], axis: Option<usize>) -> Result<Self> {
        let shapes = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                store.shape(name).map(|shape| DatasetShape::new(name, shape))
            })
            .collect::<Result<Vec<_>>>()?;
        let index = DatasetIndex::build(&shapes, axis)?;
        info!(
            "indexed {} datasets in {} ({} frames)",
            shapes.len(),
            store.location(),
            index.total_length()
        );
        Ok(Self::new(store, index.into()))
    }

    /// Builds a grouped index; every frame concatenates one row of names.
    ///
    /// # Errors
    /// Returns [`vsvis_core::Error::Configuration`] for empty groups.
    pub fn grouped(store: Arc<dyn Store>, groups: Vec<Vec<String>>) -> Result<Self> {
        let index = GroupIndex::build(groups)?;
        info!("indexed {} frame groups in {}", index.len(), store.location());
        Ok(Self::new(store, index.into()))
    }

    /// Builds a grouped index whose frame `i` joins `columns[0][i]`,
    /// `columns[1][i]` and so on, e.g. coordinates plus probabilities.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the name lists differ in length.
    pub fn zipped(store: Arc<dyn Store>, columns: &[Vec<String>]) -> Result<Self> {
        let frames = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != frames) {
            return Err(Error::InvalidFormat(format!(
                "cannot pair {frames} datasets with {}",
                bad.len()
            )));
        }
        let groups = (0..frames)
            .map(|i| columns.iter().map(|c| c[i].clone()).collect())
            .collect();
        Self::grouped(store, groups)
    }

    /// Number of logical frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if there are no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Index used to address the store.
    #[must_use]
    pub fn index(&self) -> &VirtualIndex {
        &self.index
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Fetches the array at logical `index`.
    ///
    /// Flat indices read one slice (or one whole dataset). Grouped indices
    /// read every dataset of the group and join them column-wise; 1-D
    /// datasets become single columns.
    ///
    /// # Errors
    /// Returns [`vsvis_core::Error::IndexOutOfRange`] outside `[0, len)` and
    /// any store error.
    pub fn request(&self, index: i64) -> Result<ArrayD<f64>> {
        match self.index.as_ref() {
            VirtualIndex::Flat(flat) => {
                let slice = flat.lookup(index)?;
                debug!("frame {index} -> {} at {}", slice.name, slice.offset());
                self.store.read(slice.name, slice.extent)
            }
            VirtualIndex::Grouped(grouped) => {
                let names = grouped.lookup(index)?;
                let parts = names
                    .iter()
                    .map(|name| self.store.read(name, Extent::Whole).and_then(|a| as_columns(a, name)))
                    .collect::<Result<Vec<_>>>()?;
                let views: Vec<ArrayView2<'_, f64>> = parts.iter().map(Array2::view).collect();
                Ok(concatenate(Axis(1), &views)?.into_dyn())
            }
        }
    }

    /// Fetches a 2-D array, such as one image of a stack.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the result is not 2-D, plus any
    /// error of [`request`](Self::request).
    pub fn request_2d(&self, index: i64) -> Result<Array2<f64>> {
        let array = self.request(index)?;
        let ndim = array.ndim();
        array
            .into_dimensionality::<Ix2>()
            .map_err(|_| Error::InvalidFormat(format!("expected a 2-D frame, got {ndim} dimensions")))
    }

    /// Closes the shared store for every clone.
    pub fn close(&self) {
        self.store.close();
    }
}

fn as_columns(array: ArrayD<f64>, name: &str) -> Result<Array2<f64>> {
    match array.ndim() {
        1 => Ok(array.insert_axis(Axis(1)).into_dimensionality::<Ix2>()?),
        2 => Ok(array.into_dimensionality::<Ix2>()?),
        n => Err(Error::InvalidFormat(format!(
            "{name} has {n} dimensions, expected 1 or 2"
        ))),
    }
}

/// Frame source reading `x, y[, probability]` rows from a data source.
#[derive(Debug, Clone)]
pub struct CoordinateSource {
    source: DataSource,
}

impl CoordinateSource {
    #[must_use]
    pub fn new(source: DataSource) -> Self {
        Self { source }
    }

    /// Underlying data source.
    #[must_use]
    pub fn data_source(&self) -> &DataSource {
        &self.source
    }

    /// Reads the coordinates of `frame`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] unless the frame is a 2-D array of
    /// at least two columns.
    pub fn coordinates(&self, frame: usize) -> Result<FrameCoordinates> {
        let index = i64::try_from(frame)
            .map_err(|_| Error::InvalidFormat(format!("frame {frame} too large")))?;
        let rows = self.source.request_2d(index)?;
        let ncols = rows.ncols();
        let data = rows.as_standard_layout();
        let values = data
            .as_slice()
            .ok_or_else(|| Error::InvalidFormat("coordinates are not contiguous".to_string()))?;
        Ok(FrameCoordinates::from_rows(values, ncols)?)
    }
}

impl FrameSource for CoordinateSource {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn fetch(&self, frame: usize) -> vsvis_core::Result<FrameCoordinates> {
        Ok(self.coordinates(frame)?)
    }
}
