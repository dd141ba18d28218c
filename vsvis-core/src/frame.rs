//! Per-frame coordinate data and the sources that provide it.

use std::cell::Cell;

use crate::{Error, Result};

/// Marker coordinates for one frame, with optional per-point probability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameCoordinates {
    points: Vec<[f64; 2]>,
    probability: Option<Vec<f32>>,
}

impl FrameCoordinates {
    /// Creates coordinates from points and an optional probability column.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCoordinates`] if the probability column does
    /// not match the number of points.
    pub fn new(points: Vec<[f64; 2]>, probability: Option<Vec<f32>>) -> Result<Self> {
        if let Some(p) = &probability {
            if p.len() != points.len() {
                return Err(Error::InvalidCoordinates(format!(
                    "{} probabilities for {} points",
                    p.len(),
                    points.len()
                )));
            }
        }
        Ok(Self {
            points,
            probability,
        })
    }

    /// Interprets row-major data with `ncols` columns as `x, y[, p, ...]`.
    ///
    /// A third column, when present, is read as the detection probability;
    /// further columns are ignored.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCoordinates`] if there are fewer than two
    /// columns or `data` is not a whole number of rows.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_rows(data: &[f64], ncols: usize) -> Result<Self> {
        if ncols < 2 {
            return Err(Error::InvalidCoordinates(format!(
                "expected at least 2 columns (x, y), got {ncols}"
            )));
        }
        if data.len() % ncols != 0 {
            return Err(Error::InvalidCoordinates(format!(
                "{} values do not form rows of {ncols}",
                data.len()
            )));
        }
        let rows = data.chunks_exact(ncols);
        let points = rows.clone().map(|r| [r[0], r[1]]).collect();
        let probability = (ncols > 2).then(|| rows.map(|r| r[2] as f32).collect());
        Ok(Self {
            points,
            probability,
        })
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the frame has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point positions.
    #[must_use]
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// Probability column, if present.
    #[must_use]
    pub fn probability(&self) -> Option<&[f32]> {
        self.probability.as_deref()
    }

    /// Iterates `(x, y, probability)` per point.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, Option<f32>)> + '_ {
        self.points.iter().enumerate().map(|(i, &[x, y])| {
            let p = self.probability.as_ref().map(|p| p[i]);
            (x, y, p)
        })
    }
}

/// Provider of per-frame coordinates for one category.
pub trait FrameSource {
    /// Number of frames available.
    fn len(&self) -> usize;

    /// Returns true if there are no frames.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the coordinates of `frame`.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] for unknown frames and store
    /// errors for failed reads.
    fn fetch(&self, frame: usize) -> Result<FrameCoordinates>;
}

/// In-memory frame source that counts how often it is read.
#[derive(Debug, Default)]
pub struct VecFrameSource {
    frames: Vec<FrameCoordinates>,
    fetches: Cell<usize>,
}

impl VecFrameSource {
    /// Wraps already loaded frames.
    #[must_use]
    pub fn new(frames: Vec<FrameCoordinates>) -> Self {
        Self {
            frames,
            fetches: Cell::new(0),
        }
    }

    /// Number of successful and failed fetches so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

impl FrameSource for VecFrameSource {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn fetch(&self, frame: usize) -> Result<FrameCoordinates> {
        self.fetches.set(self.fetches.get() + 1);
        self.frames.get(frame).cloned().ok_or(Error::IndexOutOfRange {
            index: i64::try_from(frame).unwrap_or(i64::MAX),
            len: self.frames.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_with_probability() {
        let data = [1.0, 2.0, 0.5, 3.0, 4.0, 0.25];
        let coords = FrameCoordinates::from_rows(&data, 3).unwrap();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords.points(), &[[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(coords.probability(), Some(&[0.5f32, 0.25][..]));
        let collected: Vec<_> = coords.iter().collect();
        assert_eq!(collected[1], (3.0, 4.0, Some(0.25)));
    }

    #[test]
    fn test_from_rows_rejects_bad_shapes() {
        assert!(FrameCoordinates::from_rows(&[1.0, 2.0], 1).is_err());
        assert!(FrameCoordinates::from_rows(&[1.0, 2.0, 3.0], 2).is_err());
        assert!(FrameCoordinates::from_rows(&[], 2).unwrap().is_empty());
    }

    #[test]
    fn test_probability_length_checked() {
        assert!(FrameCoordinates::new(vec![[0.0, 0.0]], Some(vec![0.1, 0.2])).is_err());
    }

    #[test]
    fn test_vec_source_counts_fetches() {
        let source = VecFrameSource::new(vec![FrameCoordinates::default()]);
        assert!(source.fetch(0).is_ok());
        assert!(source.fetch(1).is_err());
        assert_eq!(source.fetch_count(), 2);
        assert_eq!(source.len(), 1);
    }
}
