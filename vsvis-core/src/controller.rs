//! Frame navigation and selection-driven visibility.
//!
//! The controller owns the scene cache and one frame source per marker
//! category. A marker is shown when its row is selected in the category's
//! table and, for categories with probabilities, its probability reaches
//! the category threshold.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};

use crate::canvas::{Canvas, NullCanvas};
use crate::config::{Category, ViewerConfig};
use crate::frame::{FrameCoordinates, FrameSource};
use crate::marker::{MarkerFactory, MarkerRecord};
use crate::scene::{FetchOutcome, FetchTicket, MarkerScene};
use crate::selection::{Selection, VisibilityDelta};
use crate::{Error, Result};

/// Drives a [`MarkerScene`] from frame changes and table selections.
pub struct Controller<C: Canvas = NullCanvas> {
    scene: MarkerScene<C>,
    sources: HashMap<Category, Box<dyn FrameSource>>,
    selections: HashMap<Category, BTreeSet<usize>>,
    thresholds: HashMap<Category, f32>,
    index: usize,
    active: Option<Category>,
    default_threshold: f32,
}

impl Controller<NullCanvas> {
    /// Creates a controller without a canvas.
    #[must_use]
    pub fn headless(config: &ViewerConfig) -> Self {
        Self::new(config, NullCanvas)
    }
}

impl<C: Canvas> Controller<C> {
    /// Creates a controller with no sources loaded.
    #[must_use]
    pub fn new(config: &ViewerConfig, canvas: C) -> Self {
        Self {
            scene: MarkerScene::new(config, canvas),
            sources: HashMap::new(),
            selections: HashMap::new(),
            thresholds: HashMap::new(),
            index: 0,
            active: None,
            default_threshold: config.probability_threshold,
        }
    }

    /// Scene cache holding the markers of every category.
    #[must_use]
    pub fn scene(&self) -> &MarkerScene<C> {
        &self.scene
    }

    /// Mutable scene access, e.g. for the canvas.
    pub fn scene_mut(&mut self) -> &mut MarkerScene<C> {
        &mut self.scene
    }

    /// Current frame index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Category whose table is currently shown.
    #[must_use]
    pub fn active_category(&self) -> Option<Category> {
        self.active
    }

    /// Returns true if `category` has a source.
    #[must_use]
    pub fn has_source(&self, category: Category) -> bool {
        self.sources.contains_key(&category)
    }

    /// Number of frames reachable through the loaded sources.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.sources.values().map(|s| s.len()).max().unwrap_or(0)
    }

    /// Replaces the source of `category`.
    ///
    /// The category's scene group is rebuilt with `factory`, its selection is
    /// cleared and the old source is dropped. The current frame is loaded
    /// from the new source when it has one; if that load fails the new source
    /// is removed again and the category is left without a source.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for the image category and any error
    /// from loading the current frame.
    pub fn set_source(
        &mut self,
        category: Category,
        source: Box<dyn FrameSource>,
        factory: MarkerFactory,
    ) -> Result<()> {
        if category == Category::Image {
            return Err(Error::Configuration(
                "the image category carries no markers".to_string(),
            ));
        }
        self.scene.add_top_level_group(category, factory);
        self.selections.remove(&category);
        let frames = source.len();
        if self.sources.insert(category, source).is_some() {
            info!("replaced {category} source ({frames} frames)");
        } else {
            info!("loaded {category} source ({frames} frames)");
        }

        self.scene.set_displayed_frame(self.index);
        if self.index < frames {
            let loaded = self
                .scene
                .begin_fetch(category, self.index)
                .and_then(|ticket| self.fetch_now(ticket));
            if let Err(e) = loaded {
                warn!("dropping {category} source, frame {} failed: {e}", self.index);
                self.remove_source(category);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drops the source of `category` together with its markers.
    pub fn remove_source(&mut self, category: Category) -> bool {
        self.selections.remove(&category);
        self.scene.clear_category(category);
        if self.active == Some(category) {
            self.active = None;
        }
        self.sources.remove(&category).is_some()
    }

    /// Moves to `frame`, loading missing frame subgroups synchronously.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past the last frame and any fetch
    /// error.
    pub fn set_index(&mut self, frame: usize) -> Result<()> {
        for ticket in self.begin_index(frame)? {
            self.fetch_now(ticket)?;
        }
        Ok(())
    }

    /// Moves to `frame` without fetching.
    ///
    /// Markers of the old frame are hidden, table selections are cleared and
    /// a ticket is returned for every category whose frame is not resident.
    /// Each ticket is finished with [`complete_fetch`](Self::complete_fetch).
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past the last frame.
    pub fn begin_index(&mut self, frame: usize) -> Result<Vec<FetchTicket>> {
        let count = self.frame_count();
        if !self.sources.is_empty() && frame >= count {
            return Err(Error::IndexOutOfRange {
                index: i64::try_from(frame).unwrap_or(i64::MAX),
                len: count,
            });
        }

        let previous = self.index;
        for category in Category::MARKERS {
            self.scene
                .set_visible(category, previous, false, &Selection::All);
        }
        self.selections.clear();
        self.index = frame;
        self.scene.set_displayed_frame(frame);
        debug!("frame {previous} -> {frame}");

        let mut tickets = Vec::new();
        for category in Category::MARKERS {
            let Some(source) = self.sources.get(&category) else {
                continue;
            };
            if frame < source.len() && !self.scene.is_resident(category, frame) {
                tickets.push(self.scene.begin_fetch(category, frame)?);
            }
        }
        Ok(tickets)
    }

    /// Applies a fetch result produced for a ticket of
    /// [`begin_index`](Self::begin_index).
    ///
    /// # Errors
    /// Returns the fetch error or a marker construction error.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<FrameCoordinates>,
    ) -> Result<FetchOutcome> {
        let outcome = self.scene.complete_fetch(ticket, result)?;
        if outcome == FetchOutcome::Inserted && ticket.frame() == self.index {
            self.refresh(ticket.category());
        }
        Ok(outcome)
    }

    /// Switches the active table to `category`.
    ///
    /// Every category is hidden on the current frame, then the selected rows
    /// of `category` are shown.
    pub fn tab_changed(&mut self, category: Category, selected_rows: &[usize]) -> bool {
        for other in Category::MARKERS {
            self.scene
                .set_visible(other, self.index, false, &Selection::All);
        }
        self.active = Some(category);
        self.selections
            .insert(category, selected_rows.iter().copied().collect());
        self.refresh(category)
    }

    /// Applies one table selection delta to the current frame.
    ///
    /// Rows present in both lists cancel out. Returns the net delta.
    pub fn toggle_by_selection(
        &mut self,
        selected_rows: &[usize],
        deselected_rows: &[usize],
        category: Category,
    ) -> VisibilityDelta {
        let delta = VisibilityDelta::coalesce(selected_rows, deselected_rows);
        if delta.is_empty() {
            return delta;
        }

        let selection = self.selections.entry(category).or_default();
        selection.extend(delta.show.iter().copied());
        selection.retain(|row| !delta.hide.contains(row));

        let threshold = self.threshold(category);
        let frame = self.index;
        if !delta.hide.is_empty() {
            self.scene
                .set_visible(category, frame, false, &Selection::Keys(delta.hide.clone()));
        }
        if threshold > 0.0 {
            let show = delta.show.clone();
            self.scene.mask_markers(category, frame, |m| {
                let key = m.key().unwrap_or(usize::MAX);
                if show.contains(&key) {
                    passes(m, threshold)
                } else {
                    m.visible
                }
            });
        } else if !delta.show.is_empty() {
            self.scene
                .set_visible(category, frame, true, &Selection::Keys(delta.show.clone()));
        }
        delta
    }

    /// Sets the probability threshold of `category` and re-masks its markers
    /// on the current frame.
    pub fn set_probability_threshold(&mut self, category: Category, threshold: f32) -> bool {
        self.thresholds.insert(category, threshold);
        self.refresh(category)
    }

    /// Probability threshold of `category`.
    #[must_use]
    pub fn threshold(&self, category: Category) -> f32 {
        self.thresholds
            .get(&category)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    /// Selected rows of `category` on the current frame.
    #[must_use]
    pub fn selection(&self, category: Category) -> Option<&BTreeSet<usize>> {
        self.selections.get(&category)
    }

    /// Markers of `category` on the current frame.
    ///
    /// # Errors
    /// Returns [`Error::PreconditionViolation`] if the category has no source.
    pub fn markers(&self, category: Category) -> Result<Option<Vec<&MarkerRecord>>> {
        self.scene.get_markers(category, self.index)
    }

    fn fetch_now(&mut self, ticket: FetchTicket) -> Result<FetchOutcome> {
        let result = match self.sources.get(&ticket.category()) {
            Some(source) => source.fetch(ticket.frame()),
            None => Err(Error::PreconditionViolation(format!(
                "no source for {}",
                ticket.category()
            ))),
        };
        self.complete_fetch(ticket, result)
    }

    /// Recomputes visibility of `category` on the current frame from its
    /// selection and threshold.
    fn refresh(&mut self, category: Category) -> bool {
        let threshold = self.threshold(category);
        let empty = BTreeSet::new();
        let selected = self.selections.get(&category).unwrap_or(&empty);
        self.scene.mask_markers(category, self.index, |m| {
            m.key().is_some_and(|k| selected.contains(&k)) && passes(m, threshold)
        })
    }
}

fn passes(marker: &MarkerRecord, threshold: f32) -> bool {
    !matches!(marker.probability, Some(p) if p < threshold)
}
