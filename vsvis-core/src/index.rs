//! Virtual indexing over lists of separately stored datasets.
//!
//! A [`DatasetIndex`] presents several arrays as if they were stacked along
//! one axis, so that a single logical index addresses one slice of one
//! array. A [`GroupIndex`] maps a logical index to a whole group of dataset
//! names whose contents are concatenated by the data source.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Name and shape of one dataset, as probed from the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DatasetShape {
    /// Path of the dataset inside the store.
    pub name: String,
    /// Extent of each dimension.
    pub shape: Vec<usize>,
}

impl DatasetShape {
    /// Creates a dataset shape description.
    pub fn new(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// Number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

/// Part of a dataset addressed by one logical index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// The whole dataset.
    Whole,
    /// One slice at `offset` along `axis`.
    Slice { axis: usize, offset: usize },
}

/// Result of a [`DatasetIndex::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSlice<'a> {
    /// Name of the dataset holding the requested frame.
    pub name: &'a str,
    /// Position of that dataset in the index.
    pub position: usize,
    /// Portion of the dataset to read.
    pub extent: Extent,
}

impl DatasetSlice<'_> {
    /// Offset within the dataset, `0` for whole-dataset lookups.
    #[must_use]
    pub fn offset(&self) -> usize {
        match self.extent {
            Extent::Whole => 0,
            Extent::Slice { offset, .. } => offset,
        }
    }
}

/// One-dimensional virtual index over a list of datasets.
///
/// With an axis, the datasets behave as if concatenated along that axis and
/// `total_length` is the sum of their extents. Without an axis each logical
/// index names one whole dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DatasetIndex {
    names: Vec<String>,
    dims: Vec<usize>,
    axis: Option<usize>,
    cumulative: Vec<usize>,
}

impl DatasetIndex {
    /// Builds the index by accumulating the extent of every dataset along
    /// `axis`.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `datasets` is empty, or if an axis
    /// is given and the datasets disagree in dimensionality or are too
    /// low-dimensional for it.
    pub fn build(datasets: &[DatasetShape], axis: Option<usize>) -> Result<Self> {
        let Some(first) = datasets.first() else {
            return Err(Error::Configuration(
                "at least one dataset name is required".to_string(),
            ));
        };

        let names = datasets.iter().map(|d| d.name.clone()).collect();
        let dims: Vec<usize> = datasets.iter().map(DatasetShape::ndim).collect();

        let Some(axis) = axis else {
            return Ok(Self {
                names,
                dims,
                axis: None,
                cumulative: Vec::new(),
            });
        };

        if let Some(odd) = datasets.iter().find(|d| d.ndim() != first.ndim()) {
            return Err(Error::Configuration(format!(
                "dataset {} has {} dimensions but {} has {}",
                odd.name,
                odd.ndim(),
                first.name,
                first.ndim()
            )));
        }
        if axis >= first.ndim() {
            return Err(Error::Configuration(format!(
                "axis {axis} out of bounds for {}-dimensional datasets",
                first.ndim()
            )));
        }

        let mut total = 0usize;
        let cumulative = datasets
            .iter()
            .map(|d| {
                total += d.shape[axis];
                total
            })
            .collect();

        Ok(Self {
            names,
            dims,
            axis: Some(axis),
            cumulative,
        })
    }

    /// Number of logical indices.
    #[must_use]
    pub fn total_length(&self) -> usize {
        match self.axis {
            Some(_) => self.cumulative.last().copied().unwrap_or(0),
            None => self.names.len(),
        }
    }

    /// Dataset names in index order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Stacking axis, if any.
    #[must_use]
    pub fn axis(&self) -> Option<usize> {
        self.axis
    }

    /// Running totals of dataset extents; empty without an axis.
    #[must_use]
    pub fn cumulative_lengths(&self) -> &[usize] {
        &self.cumulative
    }

    /// Dimensionality of the dataset at `position`.
    #[must_use]
    pub fn ndim(&self, position: usize) -> Option<usize> {
        self.dims.get(position).copied()
    }

    /// Maps a logical index to the dataset and offset that hold it.
    ///
    /// An index that lands exactly on a cumulative boundary belongs to the
    /// next dataset at offset 0.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] if `index` is negative or not less
    /// than [`total_length`](Self::total_length).
    pub fn lookup(&self, index: i64) -> Result<DatasetSlice<'_>> {
        let len = self.total_length();
        let idx = checked_index(index, len)?;

        let Some(axis) = self.axis else {
            return Ok(DatasetSlice {
                name: &self.names[idx],
                position: idx,
                extent: Extent::Whole,
            });
        };

        // first cumulative length strictly greater than idx
        let position = self.cumulative.partition_point(|&c| c <= idx);
        let offset = if position == 0 {
            idx
        } else {
            idx - self.cumulative[position - 1]
        };

        Ok(DatasetSlice {
            name: &self.names[position],
            position,
            extent: Extent::Slice { axis, offset },
        })
    }
}

/// Index whose every logical position names a group of datasets.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupIndex {
    groups: Vec<Vec<String>>,
}

impl GroupIndex {
    /// Builds the index from rows of dataset names.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if there are no rows or a row is
    /// empty.
    pub fn build(groups: Vec<Vec<String>>) -> Result<Self> {
        if groups.is_empty() {
            return Err(Error::Configuration(
                "at least one dataset group is required".to_string(),
            ));
        }
        if let Some(row) = groups.iter().position(Vec::is_empty) {
            return Err(Error::Configuration(format!("dataset group {row} is empty")));
        }
        Ok(Self { groups })
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Always false for a successfully built index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All groups in index order.
    #[must_use]
    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Returns the group of names at `index`.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] outside `[0, len)`.
    pub fn lookup(&self, index: i64) -> Result<&[String]> {
        let idx = checked_index(index, self.groups.len())?;
        Ok(&self.groups[idx])
    }
}

/// Either flavour of virtual index, as held by a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VirtualIndex {
    Flat(DatasetIndex),
    Grouped(GroupIndex),
}

impl VirtualIndex {
    /// Number of logical indices.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            VirtualIndex::Flat(index) => index.total_length(),
            VirtualIndex::Grouped(index) => index.len(),
        }
    }

    /// True when the index addresses nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<DatasetIndex> for VirtualIndex {
    fn from(index: DatasetIndex) -> Self {
        VirtualIndex::Flat(index)
    }
}

impl From<GroupIndex> for VirtualIndex {
    fn from(index: GroupIndex) -> Self {
        VirtualIndex::Grouped(index)
    }
}

fn checked_index(index: i64, len: usize) -> Result<usize> {
    match usize::try_from(index) {
        Ok(idx) if idx < len => Ok(idx),
        _ => Err(Error::IndexOutOfRange { index, len }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stacked(lengths: &[usize]) -> DatasetIndex {
        let shapes: Vec<_> = lengths
            .iter()
            .enumerate()
            .map(|(i, &n)| DatasetShape::new(format!("d{i}"), vec![n, 4, 4]))
            .collect();
        DatasetIndex::build(&shapes, Some(0)).unwrap()
    }

    #[test]
    fn test_two_arrays_scenario() {
        let shapes = [
            DatasetShape::new("A", vec![3, 2]),
            DatasetShape::new("B", vec![2, 2]),
        ];
        let index = DatasetIndex::build(&shapes, Some(0)).unwrap();
        assert_eq!(index.total_length(), 5);

        for i in 0..3 {
            let slice = index.lookup(i).unwrap();
            assert_eq!(slice.name, "A");
            assert_eq!(slice.offset(), usize::try_from(i).unwrap());
        }
        for (i, offset) in [(3, 0), (4, 1)] {
            let slice = index.lookup(i).unwrap();
            assert_eq!(slice.name, "B");
            assert_eq!(slice.position, 1);
            assert_eq!(slice.offset(), offset);
        }
        assert!(matches!(
            index.lookup(5),
            Err(Error::IndexOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn test_every_index_maps_inside_its_array() {
        let lengths = [4, 1, 7, 2, 5];
        let index = stacked(&lengths);
        assert_eq!(index.total_length(), lengths.iter().sum::<usize>());

        for i in 0..index.total_length() {
            let slice = index.lookup(i64::try_from(i).unwrap()).unwrap();
            assert!(slice.offset() < lengths[slice.position]);
            assert_eq!(slice.extent, Extent::Slice { axis: 0, offset: slice.offset() });
        }
    }

    #[test]
    fn test_boundaries_go_to_next_array() {
        let index = stacked(&[3, 4, 2]);
        let cumulative = index.cumulative_lengths().to_vec();
        assert_eq!(cumulative, vec![3, 7, 9]);

        for k in 0..cumulative.len() - 1 {
            let c = i64::try_from(cumulative[k]).unwrap();
            let last = index.lookup(c - 1).unwrap();
            assert_eq!(last.position, k);
            assert_eq!(last.offset(), [3, 4, 2][k] - 1);

            let next = index.lookup(c).unwrap();
            assert_eq!(next.position, k + 1);
            assert_eq!(next.offset(), 0);
        }
    }

    #[test]
    fn test_negative_and_past_end_rejected() {
        let index = stacked(&[2, 2]);
        assert!(matches!(index.lookup(-1), Err(Error::IndexOutOfRange { .. })));
        assert!(matches!(index.lookup(4), Err(Error::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_zero_length_array_is_skipped() {
        let index = stacked(&[2, 0, 1]);
        let slice = index.lookup(2).unwrap();
        assert_eq!(slice.name, "d2");
        assert_eq!(slice.offset(), 0);
    }

    #[test]
    fn test_no_axis_is_identity() {
        let shapes = [
            DatasetShape::new("/image/a", vec![3, 128, 128]),
            DatasetShape::new("/image/b", vec![5, 64]),
        ];
        let index = DatasetIndex::build(&shapes, None).unwrap();
        assert_eq!(index.total_length(), 2);
        let slice = index.lookup(1).unwrap();
        assert_eq!(slice.name, "/image/b");
        assert_eq!(slice.extent, Extent::Whole);
        assert!(index.lookup(2).is_err());
    }

    #[test]
    fn test_build_errors() {
        assert!(matches!(
            DatasetIndex::build(&[], Some(0)),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(DatasetIndex::build(&[], None), Err(Error::Configuration(_))));

        let mixed = [
            DatasetShape::new("a", vec![3, 2]),
            DatasetShape::new("b", vec![3]),
        ];
        assert!(matches!(
            DatasetIndex::build(&mixed, Some(0)),
            Err(Error::Configuration(_))
        ));
        // dimensionality only matters when stacking
        assert!(DatasetIndex::build(&mixed, None).is_ok());

        let flat = [DatasetShape::new("a", vec![3])];
        assert!(matches!(
            DatasetIndex::build(&flat, Some(1)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_group_index() {
        let index = GroupIndex::build(vec![
            vec!["/pred/coordinates/0".into(), "/pred/probabilities/0".into()],
            vec!["/pred/coordinates/1".into(), "/pred/probabilities/1".into()],
        ])
        .unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup(1).unwrap()[0], "/pred/coordinates/1");
        assert!(matches!(index.lookup(2), Err(Error::IndexOutOfRange { .. })));
        assert!(matches!(index.lookup(-1), Err(Error::IndexOutOfRange { .. })));

        assert!(GroupIndex::build(Vec::new()).is_err());
        assert!(GroupIndex::build(vec![vec!["a".into()], Vec::new()]).is_err());
    }

    #[test]
    fn test_virtual_index_len() {
        let flat: VirtualIndex = stacked(&[2, 3]).into();
        assert_eq!(flat.len(), 5);
        let grouped: VirtualIndex = GroupIndex::build(vec![vec!["a".into()]]).unwrap().into();
        assert_eq!(grouped.len(), 1);
        assert!(!grouped.is_empty());
    }
}
