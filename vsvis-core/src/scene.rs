//! Bounded marker scene cache.
//!
//! Every category owns a top-level group whose children are frame
//! subgroups keyed by frame index. Frame subgroups are materialized on
//! demand from a [`FrameSource`] and evicted once a category holds more
//! than `buffer_size` of them.
//!
//! Fetching can be split from insertion with [`MarkerScene::begin_fetch`]
//! and [`MarkerScene::complete_fetch`], so the read can run off the UI
//! thread. Only the latest ticket of a category is honoured; anything
//! older is dropped without touching the scene.

use std::collections::HashMap;

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::canvas::{Canvas, NullCanvas};
use crate::config::{Category, EvictionPolicy, ViewerConfig, MIN_BUFFER_SIZE};
use crate::frame::{FrameCoordinates, FrameSource};
use crate::marker::{MarkerFactory, MarkerRecord};
use crate::selection::Selection;
use crate::tree::{MarkerTree, NodeId};
use crate::{Error, Result};

/// Identifies one pending frame fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    category: Category,
    frame: usize,
    generation: u64,
}

impl FetchTicket {
    /// Category the fetch belongs to.
    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Requested frame.
    #[must_use]
    pub fn frame(&self) -> usize {
        self.frame
    }
}

/// What [`MarkerScene::complete_fetch`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A new frame subgroup was created.
    Inserted,
    /// The frame was already resident; the result was not needed.
    AlreadyResident,
    /// The ticket was superseded; nothing changed.
    Discarded,
}

/// Whether [`MarkerScene::ensure_frame`] hit the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Hit,
    Loaded,
}

/// Cache counters for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub discarded: u64,
}

#[derive(Debug, Clone, Copy)]
struct FrameEntry {
    node: NodeId,
    last_used: u64,
}

#[derive(Debug)]
struct CategoryState {
    root: NodeId,
    factory: MarkerFactory,
    frames: HashMap<usize, FrameEntry>,
    pending: Option<FetchTicket>,
    stats: CacheStats,
}

/// Marker scene with a bounded number of resident frames per category.
pub struct MarkerScene<C: Canvas = NullCanvas> {
    tree: MarkerTree,
    canvas: C,
    categories: HashMap<Category, CategoryState>,
    buffer_size: usize,
    evict_fraction: f64,
    policy: EvictionPolicy,
    rng: StdRng,
    displayed: Option<usize>,
    clock: u64,
    /// Last ticket generation handed out; never reset, so tickets stay
    /// unique across replaced top-level groups.
    generation: u64,
}

impl MarkerScene<NullCanvas> {
    /// Creates a scene that reports to no canvas.
    #[must_use]
    pub fn headless(config: &ViewerConfig) -> Self {
        Self::new(config, NullCanvas)
    }
}

impl<C: Canvas> MarkerScene<C> {
    /// Creates an empty scene reporting to `canvas`.
    ///
    /// Buffer sizes below [`MIN_BUFFER_SIZE`] are raised to it.
    #[must_use]
    pub fn new(config: &ViewerConfig, canvas: C) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            tree: MarkerTree::new(),
            canvas,
            categories: HashMap::new(),
            buffer_size: config.buffer_size.max(MIN_BUFFER_SIZE),
            evict_fraction: config.evict_fraction,
            policy: config.eviction,
            rng,
            displayed: None,
            clock: 0,
            generation: 0,
        }
    }

    /// Underlying node arena.
    #[must_use]
    pub fn tree(&self) -> &MarkerTree {
        &self.tree
    }

    /// Canvas receiving scene changes.
    #[must_use]
    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    /// Mutable canvas access.
    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    /// Maximum resident frames per category.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Creates the top-level group of `category`, replacing any existing one.
    pub fn add_top_level_group(&mut self, category: Category, factory: MarkerFactory) -> NodeId {
        self.clear_category(category);
        let root = self.tree.create_group();
        self.canvas.add_child(root, None);
        self.categories.insert(
            category,
            CategoryState {
                root,
                factory,
                frames: HashMap::new(),
                pending: None,
                stats: CacheStats::default(),
            },
        );
        debug!("created top-level marker group for {category}");
        root
    }

    /// Returns true if `category` has a top-level group.
    #[must_use]
    pub fn has_top_level_group(&self, category: Category) -> bool {
        self.categories.contains_key(&category)
    }

    /// Top-level group of `category`.
    #[must_use]
    pub fn top_level_group(&self, category: Category) -> Option<NodeId> {
        self.categories.get(&category).map(|s| s.root)
    }

    /// Factory used for new markers of `category`.
    pub fn factory_mut(&mut self, category: Category) -> Option<&mut MarkerFactory> {
        self.categories.get_mut(&category).map(|s| &mut s.factory)
    }

    /// Frame currently on screen.
    #[must_use]
    pub fn displayed_frame(&self) -> Option<usize> {
        self.displayed
    }

    /// Marks `frame` as displayed. It is protected from eviction, and pending
    /// fetches for any other frame are cancelled.
    pub fn set_displayed_frame(&mut self, frame: usize) {
        self.displayed = Some(frame);
        self.clock += 1;
        let now = self.clock;
        for (category, state) in &mut self.categories {
            if let Some(entry) = state.frames.get_mut(&frame) {
                entry.last_used = now;
            }
            if state.pending.is_some_and(|t| t.frame != frame) {
                debug!("cancelled pending {category} fetch after frame change");
                state.pending = None;
            }
        }
    }

    /// Returns true if the frame subgroup of `category` is resident.
    #[must_use]
    pub fn is_resident(&self, category: Category, frame: usize) -> bool {
        self.categories
            .get(&category)
            .is_some_and(|s| s.frames.contains_key(&frame))
    }

    /// Number of resident frame subgroups of `category`.
    #[must_use]
    pub fn resident_count(&self, category: Category) -> usize {
        self.categories.get(&category).map_or(0, |s| s.frames.len())
    }

    /// Resident frame indices of `category`, sorted.
    #[must_use]
    pub fn resident_frames(&self, category: Category) -> Vec<usize> {
        self.categories
            .get(&category)
            .map(|s| self.tree.child_keys(s.root))
            .unwrap_or_default()
    }

    /// Cache counters of `category`.
    #[must_use]
    pub fn stats(&self, category: Category) -> Option<CacheStats> {
        self.categories.get(&category).map(|s| s.stats)
    }

    /// Makes the frame subgroup resident, reading from `source` on a miss.
    ///
    /// # Errors
    /// Returns [`Error::PreconditionViolation`] if the category has no
    /// top-level group, and any error of the fetch or of marker creation.
    /// A failed load leaves no subgroup behind.
    pub fn ensure_frame<S>(&mut self, category: Category, frame: usize, source: &S) -> Result<FrameStatus>
    where
        S: FrameSource + ?Sized,
    {
        let now = self.clock + 1;
        let state = self.state_mut(category)?;
        if let Some(entry) = state.frames.get_mut(&frame) {
            entry.last_used = now;
            state.stats.hits += 1;
            self.clock = now;
            return Ok(FrameStatus::Hit);
        }

        let ticket = self.begin_fetch(category, frame)?;
        match self.complete_fetch(ticket, source.fetch(frame))? {
            FetchOutcome::Inserted => Ok(FrameStatus::Loaded),
            FetchOutcome::AlreadyResident => Ok(FrameStatus::Hit),
            FetchOutcome::Discarded => Err(Error::PreconditionViolation(format!(
                "fetch of {category} frame {frame} was superseded"
            ))),
        }
    }

    /// Registers a fetch of `frame`, superseding any pending fetch of the
    /// same category.
    ///
    /// # Errors
    /// Returns [`Error::PreconditionViolation`] if the category has no
    /// top-level group.
    pub fn begin_fetch(&mut self, category: Category, frame: usize) -> Result<FetchTicket> {
        let generation = self.generation + 1;
        let state = self.state_mut(category)?;
        let ticket = FetchTicket {
            category,
            frame,
            generation,
        };
        state.pending = Some(ticket);
        self.generation = generation;
        Ok(ticket)
    }

    /// Applies the result of a fetch started with [`begin_fetch`](Self::begin_fetch).
    ///
    /// Superseded tickets are discarded without changing the scene. A failed
    /// fetch clears the pending ticket and is returned unchanged.
    ///
    /// # Errors
    /// Returns the fetch error, or a marker creation error after rolling back
    /// the partially built subgroup.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<FrameCoordinates>,
    ) -> Result<FetchOutcome> {
        let Some(state) = self.categories.get_mut(&ticket.category) else {
            warn!("dropping {} fetch for a cleared category", ticket.category);
            return Ok(FetchOutcome::Discarded);
        };
        if state.pending != Some(ticket) {
            state.stats.discarded += 1;
            debug!(
                "discarding stale fetch of {} frame {}",
                ticket.category, ticket.frame
            );
            return Ok(FetchOutcome::Discarded);
        }
        state.pending = None;

        let coordinates = result?;
        if state.frames.contains_key(&ticket.frame) {
            return Ok(FetchOutcome::AlreadyResident);
        }

        let root = state.root;
        let factory = state.factory.clone();
        let node = self.build_subgroup(root, ticket.frame, &factory, &coordinates)?;

        self.clock += 1;
        let now = self.clock;
        if let Some(state) = self.categories.get_mut(&ticket.category) {
            state.frames.insert(
                ticket.frame,
                FrameEntry {
                    node,
                    last_used: now,
                },
            );
            state.stats.misses += 1;
        }
        debug!(
            "materialized {} frame {} with {} markers",
            ticket.category,
            ticket.frame,
            coordinates.len()
        );

        self.evict_overflow(ticket.category, ticket.frame);
        Ok(FetchOutcome::Inserted)
    }

    /// Sets visibility of the selected markers of a resident frame.
    ///
    /// Returns false if the category or frame is absent. Only markers whose
    /// state actually changes are reported to the canvas.
    pub fn set_visible(
        &mut self,
        category: Category,
        frame: usize,
        visible: bool,
        selection: &Selection,
    ) -> bool {
        self.apply_visibility(category, frame, |key, _| {
            selection.contains(key).then_some(visible)
        })
    }

    /// Shows exactly the markers of a resident frame accepted by `predicate`.
    ///
    /// Returns false if the category or frame is absent.
    pub fn mask_markers<F>(&mut self, category: Category, frame: usize, predicate: F) -> bool
    where
        F: Fn(&MarkerRecord) -> bool,
    {
        self.apply_visibility(category, frame, |_, marker| Some(predicate(marker)))
    }

    /// Markers of a resident frame in key order; `None` if not resident.
    ///
    /// # Errors
    /// Returns [`Error::PreconditionViolation`] if the category has no
    /// top-level group.
    pub fn get_markers(&self, category: Category, frame: usize) -> Result<Option<Vec<&MarkerRecord>>> {
        let state = self.state(category)?;
        Ok(state.frames.get(&frame).map(|entry| {
            self.tree
                .markers(entry.node)
                .map(|(_, marker)| marker)
                .collect()
        }))
    }

    /// Marker handles of a resident frame in key order.
    #[must_use]
    pub fn marker_ids(&self, category: Category, frame: usize) -> Option<Vec<NodeId>> {
        let entry = self.categories.get(&category)?.frames.get(&frame)?;
        Some(self.tree.markers(entry.node).map(|(id, _)| id).collect())
    }

    /// Evicts one frame subgroup. Returns false if it was not resident.
    pub fn evict(&mut self, category: Category, frame: usize) -> bool {
        let Some(state) = self.categories.get_mut(&category) else {
            return false;
        };
        let Some(entry) = state.frames.remove(&frame) else {
            return false;
        };
        state.stats.evictions += 1;
        let root = state.root;
        self.canvas.remove_child(entry.node);
        self.tree.delete_child_item(root, frame)
    }

    /// Destroys every frame subgroup of `category`, keeping its top-level
    /// group. Returns the number of subgroups removed.
    ///
    /// # Errors
    /// Returns [`Error::PreconditionViolation`] if the category has no
    /// top-level group.
    pub fn clear_frames(&mut self, category: Category) -> Result<usize> {
        let state = self.state_mut(category)?;
        state.pending = None;
        let root = state.root;
        let frames: Vec<_> = state.frames.drain().collect();
        for (frame, entry) in &frames {
            self.canvas.remove_child(entry.node);
            self.tree.delete_child_item(root, *frame);
        }
        Ok(frames.len())
    }

    /// Destroys all frame subgroups and the top-level group of `category`.
    ///
    /// Returns false if the category had no top-level group.
    pub fn clear_category(&mut self, category: Category) -> bool {
        let Some(state) = self.categories.remove(&category) else {
            return false;
        };
        self.canvas.remove_child(state.root);
        let freed = self.tree.destroy(state.root);
        debug!("cleared {category}: {} frames, {freed} nodes", state.frames.len());
        true
    }

    fn state(&self, category: Category) -> Result<&CategoryState> {
        self.categories
            .get(&category)
            .ok_or_else(|| missing_group(category))
    }

    fn state_mut(&mut self, category: Category) -> Result<&mut CategoryState> {
        self.categories
            .get_mut(&category)
            .ok_or_else(|| missing_group(category))
    }

    fn build_subgroup(
        &mut self,
        root: NodeId,
        frame: usize,
        factory: &MarkerFactory,
        coordinates: &FrameCoordinates,
    ) -> Result<NodeId> {
        let group = self.tree.create_group();
        let mut markers = Vec::with_capacity(coordinates.len());
        for (x, y, p) in coordinates.iter() {
            if !(x.is_finite() && y.is_finite()) {
                self.tree.destroy(group);
                for id in markers {
                    self.tree.destroy(id);
                }
                return Err(Error::InvalidCoordinates(format!(
                    "non-finite position ({x}, {y}) in frame {frame}"
                )));
            }
            markers.push(self.tree.create_marker(factory.stamp(x, y, p)));
        }

        let attached = self
            .tree
            .replace_children(group, &markers)
            .and_then(|()| self.tree.insert_child(root, frame, group));
        if let Err(e) = attached {
            self.tree.destroy(group);
            for id in markers {
                self.tree.destroy(id);
            }
            return Err(e);
        }

        self.canvas.add_child(group, Some(root));
        for &id in &markers {
            self.canvas.add_child(id, Some(group));
        }
        Ok(group)
    }

    fn apply_visibility<F>(&mut self, category: Category, frame: usize, decide: F) -> bool
    where
        F: Fn(usize, &MarkerRecord) -> Option<bool>,
    {
        let Some(entry) = self
            .categories
            .get(&category)
            .and_then(|s| s.frames.get(&frame))
            .copied()
        else {
            return false;
        };

        for (key, id) in self.tree.children(entry.node) {
            let Some(marker) = self.tree.marker_mut(id) else {
                continue;
            };
            let Some(visible) = decide(key, marker) else {
                continue;
            };
            if marker.visible != visible {
                marker.visible = visible;
                self.canvas.set_visible(id, visible);
            }
        }
        true
    }

    /// Evicts frames of `category` once it exceeds the buffer size. The
    /// displayed frame and `keep` are never chosen.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn evict_overflow(&mut self, category: Category, keep: usize) {
        let Some(state) = self.categories.get(&category) else {
            return;
        };
        let count = state.frames.len();
        if count <= self.buffer_size {
            return;
        }

        let quota = ((self.evict_fraction * count as f64).floor() as usize).max(1);
        let displayed = self.displayed;
        let mut candidates: Vec<(usize, u64)> = state
            .frames
            .iter()
            .map(|(&frame, entry)| (frame, entry.last_used))
            .filter(|&(frame, _)| frame != keep && Some(frame) != displayed)
            .collect();
        // HashMap order is arbitrary; sort so victim choice is reproducible
        candidates.sort_unstable();
        let quota = quota.min(candidates.len());

        let victims: Vec<usize> = match self.policy {
            EvictionPolicy::LeastRecentlyUsed => {
                candidates.sort_by_key(|&(frame, used)| (used, frame));
                candidates.iter().take(quota).map(|&(frame, _)| frame).collect()
            }
            EvictionPolicy::Random => {
                rand::seq::index::sample(&mut self.rng, candidates.len(), quota)
                    .into_iter()
                    .map(|i| candidates[i].0)
                    .collect()
            }
        };

        debug!(
            "{category} holds {count} frames (limit {}), evicting {victims:?}",
            self.buffer_size
        );
        for frame in victims {
            self.evict(category, frame);
        }
    }
}

fn missing_group(category: Category) -> Error {
    Error::PreconditionViolation(format!("no top-level marker group for {category}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasEvent, RecordingCanvas};
    use crate::frame::VecFrameSource;

    fn frames(n: usize, points: usize) -> VecFrameSource {
        VecFrameSource::new(
            (0..n)
                .map(|f| {
                    let pts = (0..points).map(|i| [f as f64, i as f64]).collect();
                    FrameCoordinates::new(pts, None).unwrap()
                })
                .collect(),
        )
    }

    fn scene(config: &ViewerConfig) -> MarkerScene<RecordingCanvas> {
        let mut scene = MarkerScene::new(config, RecordingCanvas::new());
        scene.add_top_level_group(Category::GroundTruth, MarkerFactory::default());
        scene
    }

    #[test]
    fn test_cache_hit_does_not_refetch() {
        let source = frames(3, 4);
        let mut scene = scene(&ViewerConfig::default());
        assert_eq!(
            scene.ensure_frame(Category::GroundTruth, 1, &source).unwrap(),
            FrameStatus::Loaded
        );
        assert_eq!(
            scene.ensure_frame(Category::GroundTruth, 1, &source).unwrap(),
            FrameStatus::Hit
        );
        assert_eq!(source.fetch_count(), 1);
        let stats = scene.stats(Category::GroundTruth).unwrap();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_markers_start_hidden_and_keyed() {
        let source = frames(1, 3);
        let mut scene = scene(&ViewerConfig::default());
        scene.ensure_frame(Category::GroundTruth, 0, &source).unwrap();
        let markers = scene.get_markers(Category::GroundTruth, 0).unwrap().unwrap();
        assert_eq!(markers.len(), 3);
        for (i, m) in markers.iter().enumerate() {
            assert_eq!(m.key(), Some(i));
            assert!(!m.visible);
        }
    }

    #[test]
    fn test_set_visible_is_idempotent() {
        let source = frames(1, 5);
        let mut scene = scene(&ViewerConfig::default());
        scene.ensure_frame(Category::GroundTruth, 0, &source).unwrap();
        scene.canvas_mut().clear();

        let only_three: Selection = [3].into_iter().collect();
        assert!(scene.set_visible(Category::GroundTruth, 0, true, &only_three));
        assert!(scene.set_visible(Category::GroundTruth, 0, true, &only_three));
        assert_eq!(scene.canvas().visibility_changes(), 1);

        let visible: Vec<_> = scene
            .get_markers(Category::GroundTruth, 0)
            .unwrap()
            .unwrap()
            .iter()
            .filter(|m| m.visible)
            .filter_map(|m| m.key())
            .collect();
        assert_eq!(visible, vec![3]);
    }

    #[test]
    fn test_set_visible_range_and_all() {
        let source = frames(1, 6);
        let mut scene = scene(&ViewerConfig::default());
        scene.ensure_frame(Category::GroundTruth, 0, &source).unwrap();

        scene.set_visible(Category::GroundTruth, 0, true, &Selection::All);
        scene.set_visible(Category::GroundTruth, 0, false, &Selection::from(1..3));
        let flags: Vec<_> = scene
            .get_markers(Category::GroundTruth, 0)
            .unwrap()
            .unwrap()
            .iter()
            .map(|m| m.visible)
            .collect();
        assert_eq!(flags, vec![true, false, false, true, true, true]);
    }

    #[test]
    fn test_set_visible_on_absent_frame() {
        let mut scene = scene(&ViewerConfig::default());
        assert!(!scene.set_visible(Category::GroundTruth, 9, true, &Selection::All));
        assert!(!scene.set_visible(Category::Predicted, 0, true, &Selection::All));
    }

    #[test]
    fn test_bound_respected_and_latest_resident() {
        let config = ViewerConfig::default().with_buffer_size(50);
        let source = frames(60, 2);
        let mut scene = scene(&config);
        scene.set_displayed_frame(0);
        for frame in 0..60 {
            scene.ensure_frame(Category::GroundTruth, frame, &source).unwrap();
            assert!(scene.resident_count(Category::GroundTruth) <= 50);
            assert!(scene.is_resident(Category::GroundTruth, frame));
            assert!(scene.is_resident(Category::GroundTruth, 0));
        }
        assert!(scene.is_resident(Category::GroundTruth, 59));
    }

    #[test]
    fn test_random_policy_protects_displayed_frame() {
        let config = ViewerConfig::default()
            .with_buffer_size(10)
            .with_eviction(EvictionPolicy::Random)
            .with_seed(42);
        let source = frames(200, 1);
        let mut scene = scene(&config);
        scene.set_displayed_frame(7);
        for frame in 0..200 {
            scene.ensure_frame(Category::GroundTruth, frame, &source).unwrap();
            assert!(scene.resident_count(Category::GroundTruth) <= 10);
            if frame >= 7 {
                assert!(scene.is_resident(Category::GroundTruth, 7));
            }
            assert!(scene.is_resident(Category::GroundTruth, frame));
        }
    }

    #[test]
    fn test_lru_evicts_oldest_touched() {
        let config = ViewerConfig::default().with_buffer_size(3);
        let source = frames(5, 1);
        let mut scene = scene(&config);
        for frame in 0..3 {
            scene.ensure_frame(Category::GroundTruth, frame, &source).unwrap();
        }
        // touch frame 0 so frame 1 becomes the oldest
        scene.ensure_frame(Category::GroundTruth, 0, &source).unwrap();
        scene.ensure_frame(Category::GroundTruth, 3, &source).unwrap();
        assert_eq!(scene.resident_frames(Category::GroundTruth), vec![0, 2, 3]);
        assert_eq!(scene.stats(Category::GroundTruth).unwrap().evictions, 1);
    }

    #[test]
    fn test_evicted_frame_has_no_markers() {
        let config = ViewerConfig::default().with_buffer_size(2);
        let source = frames(4, 3);
        let mut scene = scene(&config);
        scene.ensure_frame(Category::GroundTruth, 0, &source).unwrap();
        let stale_ids = scene.marker_ids(Category::GroundTruth, 0).unwrap();
        for frame in 1..4 {
            scene.ensure_frame(Category::GroundTruth, frame, &source).unwrap();
        }
        assert!(!scene.is_resident(Category::GroundTruth, 0));
        assert!(scene.get_markers(Category::GroundTruth, 0).unwrap().is_none());
        assert!(stale_ids.iter().all(|&id| scene.tree().marker(id).is_none()));
        assert!(scene
            .canvas()
            .events
            .iter()
            .any(|e| matches!(e, CanvasEvent::Removed(_))));
    }

    #[test]
    fn test_missing_top_level_group_is_precondition_violation() {
        let source = frames(1, 1);
        let mut scene = MarkerScene::headless(&ViewerConfig::default());
        assert!(matches!(
            scene.ensure_frame(Category::Predicted, 0, &source),
            Err(Error::PreconditionViolation(_))
        ));
        assert!(matches!(
            scene.get_markers(Category::Predicted, 0),
            Err(Error::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_failed_fetch_leaves_nothing() {
        let source = frames(1, 2);
        let mut scene = scene(&ViewerConfig::default());
        let before = scene.tree().len();
        assert!(scene.ensure_frame(Category::GroundTruth, 5, &source).is_err());
        assert_eq!(scene.tree().len(), before);
        assert_eq!(scene.resident_count(Category::GroundTruth), 0);
    }

    #[test]
    fn test_invalid_coordinates_roll_back() {
        let bad = VecFrameSource::new(vec![FrameCoordinates::new(
            vec![[1.0, 1.0], [f64::NAN, 2.0]],
            None,
        )
        .unwrap()]);
        let mut scene = scene(&ViewerConfig::default());
        let before = scene.tree().len();
        assert!(matches!(
            scene.ensure_frame(Category::GroundTruth, 0, &bad),
            Err(Error::InvalidCoordinates(_))
        ));
        assert_eq!(scene.tree().len(), before);
        assert!(!scene.is_resident(Category::GroundTruth, 0));
    }

    #[test]
    fn test_stale_ticket_discarded() {
        let source = frames(3, 2);
        let mut scene = scene(&ViewerConfig::default());
        let old = scene.begin_fetch(Category::GroundTruth, 1).unwrap();
        let new = scene.begin_fetch(Category::GroundTruth, 2).unwrap();

        let outcome = scene.complete_fetch(old, source.fetch(1)).unwrap();
        assert_eq!(outcome, FetchOutcome::Discarded);
        assert!(!scene.is_resident(Category::GroundTruth, 1));

        let outcome = scene.complete_fetch(new, source.fetch(2)).unwrap();
        assert_eq!(outcome, FetchOutcome::Inserted);
        assert_eq!(scene.stats(Category::GroundTruth).unwrap().discarded, 1);
    }

    #[test]
    fn test_frame_change_cancels_pending_fetch() {
        let source = frames(3, 2);
        let mut scene = scene(&ViewerConfig::default());
        let ticket = scene.begin_fetch(Category::GroundTruth, 1).unwrap();
        scene.set_displayed_frame(2);
        let outcome = scene.complete_fetch(ticket, source.fetch(1)).unwrap();
        assert_eq!(outcome, FetchOutcome::Discarded);
        assert_eq!(scene.resident_count(Category::GroundTruth), 0);
    }

    #[test]
    fn test_ticket_from_replaced_group_discarded() {
        let old_source = VecFrameSource::new(vec![
            FrameCoordinates::new(vec![[1.0, 0.0]], None).unwrap();
            4
        ]);
        let new_source = VecFrameSource::new(vec![
            FrameCoordinates::new(vec![[2.0, 0.0]], None).unwrap();
            4
        ]);
        let mut scene = scene(&ViewerConfig::default());
        let stale = scene.begin_fetch(Category::GroundTruth, 3).unwrap();
        scene.add_top_level_group(Category::GroundTruth, MarkerFactory::default());
        let fresh = scene.begin_fetch(Category::GroundTruth, 3).unwrap();
        assert_ne!(stale, fresh);

        let outcome = scene.complete_fetch(stale, old_source.fetch(3)).unwrap();
        assert_eq!(outcome, FetchOutcome::Discarded);
        assert!(!scene.is_resident(Category::GroundTruth, 3));

        let outcome = scene.complete_fetch(fresh, new_source.fetch(3)).unwrap();
        assert_eq!(outcome, FetchOutcome::Inserted);
        let markers = scene.get_markers(Category::GroundTruth, 3).unwrap().unwrap();
        assert!((markers[0].x - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tiny_buffer_keeps_bound_with_displayed_frame() {
        let config = ViewerConfig::default().with_buffer_size(1);
        let source = frames(4, 1);
        let mut scene = scene(&config);
        assert_eq!(scene.buffer_size(), MIN_BUFFER_SIZE);

        scene.set_displayed_frame(0);
        for frame in 0..4 {
            scene.ensure_frame(Category::GroundTruth, frame, &source).unwrap();
            assert!(scene.resident_count(Category::GroundTruth) <= scene.buffer_size());
            assert!(scene.is_resident(Category::GroundTruth, 0));
            assert!(scene.is_resident(Category::GroundTruth, frame));
        }
    }

    #[test]
    fn test_clear_category_and_frames() {
        let source = frames(3, 2);
        let mut scene = scene(&ViewerConfig::default());
        for frame in 0..3 {
            scene.ensure_frame(Category::GroundTruth, frame, &source).unwrap();
        }
        assert_eq!(scene.clear_frames(Category::GroundTruth).unwrap(), 3);
        assert_eq!(scene.tree().len(), 1);

        scene.ensure_frame(Category::GroundTruth, 0, &source).unwrap();
        assert!(scene.clear_category(Category::GroundTruth));
        assert!(scene.tree().is_empty());
        assert!(!scene.clear_category(Category::GroundTruth));
        assert!(matches!(
            scene.get_markers(Category::GroundTruth, 0),
            Err(Error::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_mask_markers_by_probability() {
        let coords = FrameCoordinates::new(
            vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]],
            Some(vec![0.2, 0.6, 0.9]),
        )
        .unwrap();
        let source = VecFrameSource::new(vec![coords]);
        let mut scene = scene(&ViewerConfig::default());
        scene.ensure_frame(Category::GroundTruth, 0, &source).unwrap();
        assert!(scene.mask_markers(Category::GroundTruth, 0, |m| {
            m.probability.unwrap_or(0.0) >= 0.5
        }));
        let flags: Vec<_> = scene
            .get_markers(Category::GroundTruth, 0)
            .unwrap()
            .unwrap()
            .iter()
            .map(|m| m.visible)
            .collect();
        assert_eq!(flags, vec![false, true, true]);
    }

    #[test]
    fn test_factory_changes_apply_to_new_frames_only() {
        let source = frames(2, 1);
        let mut scene = scene(&ViewerConfig::default());
        scene.ensure_frame(Category::GroundTruth, 0, &source).unwrap();
        if let Some(factory) = scene.factory_mut(Category::GroundTruth) {
            *factory = factory.clone().with_size(11.0);
        }
        scene.ensure_frame(Category::GroundTruth, 1, &source).unwrap();
        let first = scene.get_markers(Category::GroundTruth, 0).unwrap().unwrap()[0].size;
        let second = scene.get_markers(Category::GroundTruth, 1).unwrap().unwrap()[0].size;
        assert!((first - 3.0).abs() < f32::EPSILON);
        assert!((second - 11.0).abs() < f32::EPSILON);
    }
}
