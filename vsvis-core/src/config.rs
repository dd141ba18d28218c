//! Viewer configuration.

use std::fmt;

use crate::marker::{Color, MarkerFactory, Shape};
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parallel data kinds displayed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Category {
    GroundTruth,
    Predicted,
    Image,
}

impl Category {
    /// Categories that carry point markers.
    pub const MARKERS: [Category; 2] = [Category::GroundTruth, Category::Predicted];

    /// Table column names for the rows of a marker category.
    #[must_use]
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Category::GroundTruth => &["X", "Y"],
            Category::Predicted => &["X", "Y", "Probability"],
            Category::Image => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::GroundTruth => write!(f, "Ground Truth"),
            Category::Predicted => write!(f, "Predicted"),
            Category::Image => write!(f, "Image"),
        }
    }
}

/// How victims are chosen when a category exceeds its frame budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EvictionPolicy {
    /// Evict the frames touched longest ago.
    #[default]
    LeastRecentlyUsed,
    /// Evict a uniform random sample of resident frames.
    Random,
}

/// Marker style for one category.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarkerStyleConfig {
    pub shape: Shape,
    pub size: f32,
    pub color: Color,
    pub filled: bool,
}

impl Default for MarkerStyleConfig {
    fn default() -> Self {
        Self {
            shape: Shape::Circle,
            size: 3.0,
            color: Color::WHITE,
            filled: true,
        }
    }
}

impl MarkerStyleConfig {
    /// Factory producing markers in this style.
    #[must_use]
    pub fn factory(&self) -> MarkerFactory {
        MarkerFactory::new(self.shape, self.size, self.color, self.filled)
    }
}

/// Smallest usable buffer size: the displayed frame and the frame being
/// inserted are both exempt from eviction.
pub const MIN_BUFFER_SIZE: usize = 2;

/// Configuration for the scene cache and marker styles.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ViewerConfig {
    /// Maximum resident frame subgroups per category, at least
    /// [`MIN_BUFFER_SIZE`].
    pub buffer_size: usize,
    /// Fraction of resident frames evicted on overflow.
    pub evict_fraction: f64,
    /// Victim selection strategy.
    pub eviction: EvictionPolicy,
    /// Seed for random eviction; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Style of ground-truth markers.
    pub ground_truth: MarkerStyleConfig,
    /// Style of predicted markers.
    pub predicted: MarkerStyleConfig,
    /// Initial probability threshold for predicted markers.
    pub probability_threshold: f32,
    /// File extensions accepted as HDF5 input.
    pub hdf5_extensions: Vec<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 50,
            evict_fraction: 0.1,
            eviction: EvictionPolicy::default(),
            seed: None,
            ground_truth: MarkerStyleConfig::default(),
            predicted: MarkerStyleConfig {
                shape: Shape::Diamond,
                color: Color::RED,
                ..MarkerStyleConfig::default()
            },
            probability_threshold: 0.0,
            hdf5_extensions: [".h5", ".hdf5", ".hf5", ".hd5"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl ViewerConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-category frame budget.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the eviction fraction.
    #[must_use]
    pub fn with_evict_fraction(mut self, fraction: f64) -> Self {
        self.evict_fraction = fraction;
        self
    }

    /// Sets the eviction policy.
    #[must_use]
    pub fn with_eviction(mut self, policy: EvictionPolicy) -> Self {
        self.eviction = policy;
        self
    }

    /// Sets the random eviction seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Style for a marker category; the image category has none.
    #[must_use]
    pub fn style(&self, category: Category) -> Option<&MarkerStyleConfig> {
        match category {
            Category::GroundTruth => Some(&self.ground_truth),
            Category::Predicted => Some(&self.predicted),
            Category::Image => None,
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for a buffer size below
    /// [`MIN_BUFFER_SIZE`], a fraction
    /// outside `(0, 1]`, or a non-positive marker size.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(Error::Configuration(format!(
                "buffer_size must be at least {MIN_BUFFER_SIZE}, got {}",
                self.buffer_size
            )));
        }
        if self.evict_fraction.is_nan() || self.evict_fraction <= 0.0 || self.evict_fraction > 1.0 {
            return Err(Error::Configuration(format!(
                "evict_fraction must be in (0, 1], got {}",
                self.evict_fraction
            )));
        }
        for (name, style) in [("ground_truth", &self.ground_truth), ("predicted", &self.predicted)] {
            if style.size.is_nan() || style.size <= 0.0 {
                return Err(Error::Configuration(format!(
                    "{name} marker size must be positive"
                )));
            }
        }
        Ok(())
    }

    /// Returns true if `path` has one of the accepted HDF5 extensions.
    #[must_use]
    pub fn is_hdf5_path(&self, path: &str) -> bool {
        let lower = path.to_ascii_lowercase();
        self.hdf5_extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.buffer_size, 50);
        assert!((config.evict_fraction - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.eviction, EvictionPolicy::LeastRecentlyUsed);
        assert_eq!(config.predicted.shape, Shape::Diamond);
        assert!(config.validate().is_ok());
        assert!(config.is_hdf5_path("/data/Test.H5"));
        assert!(!config.is_hdf5_path("/data/stack.tif"));
    }

    #[test]
    fn test_builder_and_validation() {
        let config = ViewerConfig::new()
            .with_buffer_size(0)
            .with_eviction(EvictionPolicy::Random)
            .with_seed(7);
        assert_eq!(config.seed, Some(7));
        assert!(config.validate().is_err());

        let config = ViewerConfig::new().with_evict_fraction(1.5);
        assert!(config.validate().is_err());

        // the displayed and the incoming frame cannot both fit in one slot
        assert!(ViewerConfig::new().with_buffer_size(1).validate().is_err());
        assert!(ViewerConfig::new().with_buffer_size(2).validate().is_ok());
    }

    #[test]
    fn test_style_factory() {
        let config = ViewerConfig::default();
        let factory = config.style(Category::Predicted).unwrap().factory();
        let marker = factory.stamp(1.0, 1.0, None);
        assert_eq!(marker.shape, Shape::Diamond);
        assert_eq!(marker.color, Color::RED);
        assert!(config.style(Category::Image).is_none());
    }

    #[test]
    fn test_category_columns() {
        assert_eq!(Category::Predicted.columns().len(), 3);
        assert_eq!(Category::GroundTruth.to_string(), "Ground Truth");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ViewerConfig = serde_json::from_str(
            r#"{"buffer_size": 8, "eviction": "random", "seed": 3,
                "predicted": {"shape": "circle", "size": 5.0,
                              "color": {"r": 0, "g": 0, "b": 255, "a": 255},
                              "filled": false}}"#,
        )
        .unwrap();
        assert_eq!(config.buffer_size, 8);
        assert_eq!(config.eviction, EvictionPolicy::Random);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.predicted.shape, Shape::Circle);
        assert!(!config.predicted.filled);
        assert_eq!(config.ground_truth, MarkerStyleConfig::default());
        assert!((config.evict_fraction - 0.1).abs() < f64::EPSILON);
    }
}
