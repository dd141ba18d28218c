//! HDF5 backing store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hdf5::{Dataset, File, Group};
use log::{debug, info};
use ndarray::{ArrayD, IxDyn, SliceInfo, SliceInfoElem};
use vsvis_core::{DatasetShape, Extent};

use crate::store::Store;
use crate::{Error, Result};

/// Store reading numeric datasets from an HDF5 file.
///
/// Integer and float datasets are converted to `f64` on read. The file
/// stays open until [`Store::close`] is called or the store is dropped.
#[derive(Debug)]
pub struct Hdf5Store {
    location: String,
    file: Mutex<Option<File>>,
}

impl Hdf5Store {
    /// Opens an existing HDF5 file read-only.
    ///
    /// # Errors
    /// Returns [`Error::StoreOpen`] if the file does not exist or is not a
    /// readable HDF5 file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let location = path.display().to_string();
        if !path.try_exists()? {
            return Err(Error::StoreOpen {
                path: location,
                reason: "no such file".to_string(),
            });
        }
        let file = File::open(path).map_err(|e| Error::StoreOpen {
            path: location.clone(),
            reason: e.to_string(),
        })?;
        info!("opened {location}");
        Ok(Self {
            location,
            file: Mutex::new(Some(file)),
        })
    }

    fn handle(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dataset(&self, name: &str) -> Result<Dataset> {
        let guard = self.handle();
        let file = guard
            .as_ref()
            .ok_or_else(|| Error::Closed(self.location.clone()))?;
        file.dataset(name)
            .map_err(|_| Error::DatasetNotFound(name.to_string()))
    }
}

impl Store for Hdf5Store {
    fn location(&self) -> &str {
        &self.location
    }

    fn shape(&self, name: &str) -> Result<Vec<usize>> {
        Ok(self.dataset(name)?.shape())
    }

    fn read(&self, name: &str, extent: Extent) -> Result<ArrayD<f64>> {
        let dataset = self.dataset(name)?;
        match extent {
            Extent::Whole => Ok(dataset.read_dyn::<f64>()?),
            Extent::Slice { axis, offset } => {
                let shape = dataset.shape();
                let len = shape.get(axis).copied().ok_or_else(|| {
                    Error::InvalidFormat(format!("{name} has no axis {axis}"))
                })?;
                if offset >= len {
                    return Err(Error::InvalidFormat(format!(
                        "offset {offset} outside axis {axis} of {name} (length {len})"
                    )));
                }
                let selection = axis_selection(shape.len(), axis, offset)?;
                Ok(dataset.read_slice::<f64, _, IxDyn>(selection)?)
            }
        }
    }

    fn list_datasets(&self) -> Result<Vec<DatasetShape>> {
        let guard = self.handle();
        let file = guard
            .as_ref()
            .ok_or_else(|| Error::Closed(self.location.clone()))?;
        let mut out = Vec::new();
        collect_datasets(file, &mut out)?;
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn close(&self) {
        if self.handle().take().is_some() {
            info!("closed {}", self.location);
        }
    }

    fn is_open(&self) -> bool {
        self.handle().is_some()
    }
}

/// Hyperslab picking `offset` along `axis` and everything along the rest.
fn axis_selection(
    ndim: usize,
    axis: usize,
    offset: usize,
) -> Result<SliceInfo<Vec<SliceInfoElem>, IxDyn, IxDyn>> {
    let index = isize::try_from(offset)
        .map_err(|_| Error::InvalidFormat(format!("offset {offset} too large")))?;
    let elems = (0..ndim)
        .map(|dim| {
            if dim == axis {
                SliceInfoElem::Index(index)
            } else {
                SliceInfoElem::Slice {
                    start: 0,
                    end: None,
                    step: 1,
                }
            }
        })
        .collect::<Vec<_>>();
    Ok(SliceInfo::try_from(elems)?)
}

fn collect_datasets(group: &Group, out: &mut Vec<DatasetShape>) -> Result<()> {
    for dataset in group.datasets()? {
        out.push(DatasetShape::new(dataset.name(), dataset.shape()));
    }
    for child in group.groups()? {
        debug!("descending into {}", child.name());
        collect_datasets(&child, out)?;
    }
    Ok(())
}
