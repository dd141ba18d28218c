//! Assignment of file datasets to viewer categories.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use vsvis_core::DatasetShape;
use vsvis_io::{CoordinateSource, DataSource, Store};

/// Slot of a [`DatasetLayout`] that datasets can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutTarget {
    Image,
    GroundTruth,
    Coordinates,
    Probabilities,
}

impl LayoutTarget {
    pub const ALL: [LayoutTarget; 4] = [
        LayoutTarget::Image,
        LayoutTarget::GroundTruth,
        LayoutTarget::Coordinates,
        LayoutTarget::Probabilities,
    ];
}

impl fmt::Display for LayoutTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutTarget::Image => write!(f, "Image"),
            LayoutTarget::GroundTruth => write!(f, "Ground Truth"),
            LayoutTarget::Coordinates => write!(f, "Predicted"),
            LayoutTarget::Probabilities => write!(f, "Probabilities"),
        }
    }
}

/// Datasets chosen for each category, in frame order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetLayout {
    /// Image stacks, concatenated along `image_axis`.
    pub image: Vec<String>,
    pub image_axis: usize,
    /// One ground-truth coordinate dataset per frame.
    pub ground_truth: Vec<String>,
    /// One predicted coordinate dataset per frame.
    pub coordinates: Vec<String>,
    /// Optional probability dataset per predicted frame.
    pub probabilities: Vec<String>,
}

/// Sources built from a [`DatasetLayout`].
#[derive(Debug, Default)]
pub struct ViewerSources {
    pub images: Option<DataSource>,
    pub ground_truth: Option<CoordinateSource>,
    pub predicted: Option<CoordinateSource>,
}

impl DatasetLayout {
    /// Guesses the conventional layout of a detection file: an image stack
    /// under `/image`, per-frame `/ground_truth/<n>` datasets and
    /// `/predicted/coordinates/<n>` with matching
    /// `/predicted/probabilities/<n>`.
    pub fn detect(listing: &[DatasetShape]) -> Self {
        let under = |prefix: &str, ndim: usize| -> Vec<String> {
            let mut names: Vec<String> = listing
                .iter()
                .filter(|d| d.name.starts_with(prefix) && d.ndim() == ndim)
                .map(|d| d.name.clone())
                .collect();
            names.sort_by(|a, b| natural_cmp(a, b));
            names
        };

        let mut image = under("/image", 3);
        if image.is_empty() {
            image.extend(listing.iter().find(|d| d.ndim() == 3).map(|d| d.name.clone()));
        }
        let mut coordinates = under("/predicted/coordinates/", 2);
        if coordinates.is_empty() {
            coordinates = under("/predicted/", 2);
        }

        Self {
            image,
            image_axis: 0,
            ground_truth: under("/ground_truth/", 2),
            coordinates,
            probabilities: under("/predicted/probabilities/", 1),
        }
    }

    /// Returns true if nothing is assigned.
    pub fn is_empty(&self) -> bool {
        LayoutTarget::ALL.iter().all(|&t| self.list(t).is_empty())
    }

    pub fn list(&self, target: LayoutTarget) -> &Vec<String> {
        match target {
            LayoutTarget::Image => &self.image,
            LayoutTarget::GroundTruth => &self.ground_truth,
            LayoutTarget::Coordinates => &self.coordinates,
            LayoutTarget::Probabilities => &self.probabilities,
        }
    }

    pub fn list_mut(&mut self, target: LayoutTarget) -> &mut Vec<String> {
        match target {
            LayoutTarget::Image => &mut self.image,
            LayoutTarget::GroundTruth => &mut self.ground_truth,
            LayoutTarget::Coordinates => &mut self.coordinates,
            LayoutTarget::Probabilities => &mut self.probabilities,
        }
    }

    /// Appends `names` to `target`, skipping ones already assigned there.
    pub fn assign(&mut self, target: LayoutTarget, names: impl IntoIterator<Item = String>) {
        let list = self.list_mut(target);
        for name in names {
            if !list.contains(&name) {
                list.push(name);
            }
        }
    }

    /// Builds data sources for every non-empty category.
    ///
    /// # Errors
    /// Returns the error of the first source that cannot be indexed.
    pub fn build(&self, store: &Arc<dyn Store>) -> vsvis_io::Result<ViewerSources> {
        let images = if self.image.is_empty() {
            None
        } else {
            Some(DataSource::flat(
                Arc::clone(store),
                &self.image,
                Some(self.image_axis),
            )?)
        };
        let ground_truth = if self.ground_truth.is_empty() {
            None
        } else {
            let source = DataSource::flat(Arc::clone(store), &self.ground_truth, None)?;
            Some(CoordinateSource::new(source))
        };
        let predicted = match (self.coordinates.is_empty(), self.probabilities.is_empty()) {
            (true, _) => None,
            (false, true) => Some(DataSource::flat(Arc::clone(store), &self.coordinates, None)?),
            (false, false) => Some(DataSource::zipped(
                Arc::clone(store),
                &[self.coordinates.clone(), self.probabilities.clone()],
            )?),
        }
        .map(CoordinateSource::new);

        Ok(ViewerSources {
            images,
            ground_truth,
            predicted,
        })
    }
}

/// Orders dataset paths so that numeric leaf names sort by value
/// (`/gt/2` before `/gt/10`).
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let split = |s: &str| {
        let (parent, leaf) = s.rsplit_once('/').unwrap_or(("", s));
        (parent.to_string(), leaf.parse::<u64>().ok(), leaf.to_string())
    };
    let (pa, na, la) = split(a);
    let (pb, nb, lb) = split(b);
    pa.cmp(&pb).then_with(|| match (na, nb) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => la.cmp(&lb),
    })
}
