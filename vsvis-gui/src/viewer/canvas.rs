//! Scene canvas that keeps the render list for the plot.

use std::collections::{BTreeSet, HashMap};

use vsvis_core::{Canvas, NodeId};

/// Canvas mirroring the scene graph structure plus the set of visible
/// markers. The plot draws exactly the markers in [`visible`](Self::visible).
#[derive(Debug, Default)]
pub struct EguiCanvas {
    parents: HashMap<NodeId, Option<NodeId>>,
    children: HashMap<NodeId, Vec<NodeId>>,
    visible: BTreeSet<NodeId>,
    dirty: bool,
}

impl EguiCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Markers currently shown.
    pub fn visible(&self) -> &BTreeSet<NodeId> {
        &self.visible
    }

    /// Number of items attached to the canvas.
    pub fn attached(&self) -> usize {
        self.parents.len()
    }

    /// Number of items attached directly under `parent`.
    pub fn child_count(&self, parent: NodeId) -> usize {
        self.children.get(&parent).map_or(0, Vec::len)
    }

    fn detach_from(&mut self, parent: NodeId, item: NodeId) {
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|&c| c != item);
        }
    }

    /// Returns true once after any change, so the UI can request a repaint.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl Canvas for EguiCanvas {
    fn add_child(&mut self, item: NodeId, parent: Option<NodeId>) {
        if let Some(Some(old)) = self.parents.insert(item, parent) {
            self.detach_from(old, item);
        }
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().push(item);
        }
        self.dirty = true;
    }

    fn remove_child(&mut self, item: NodeId) {
        if let Some(Some(parent)) = self.parents.get(&item).copied() {
            self.detach_from(parent, item);
        }
        let mut doomed = vec![item];
        while let Some(node) = doomed.pop() {
            self.parents.remove(&node);
            self.visible.remove(&node);
            if let Some(children) = self.children.remove(&node) {
                doomed.extend(children);
            }
        }
        self.dirty = true;
    }

    fn set_visible(&mut self, item: NodeId, visible: bool) {
        let changed = if visible {
            self.visible.insert(item)
        } else {
            self.visible.remove(&item)
        };
        self.dirty |= changed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsvis_core::{
        Category, FrameCoordinates, MarkerScene, Selection, VecFrameSource, ViewerConfig,
    };

    fn scene() -> MarkerScene<EguiCanvas> {
        let config = ViewerConfig::default().with_buffer_size(2).with_evict_fraction(1.0);
        let mut scene = MarkerScene::new(&config, EguiCanvas::new());
        scene.add_top_level_group(Category::GroundTruth, config.ground_truth.factory());
        scene
    }

    fn root(scene: &MarkerScene<EguiCanvas>) -> NodeId {
        scene.top_level_group(Category::GroundTruth).unwrap()
    }

    fn source() -> VecFrameSource {
        let frame = FrameCoordinates::new(vec![[1.0, 2.0], [3.0, 4.0]], None).unwrap();
        VecFrameSource::new(vec![frame; 3])
    }

    #[test]
    fn test_visibility_follows_scene() {
        let mut scene = scene();
        let source = source();
        scene.set_displayed_frame(0);
        scene.ensure_frame(Category::GroundTruth, 0, &source).unwrap();
        assert!(scene.canvas().visible().is_empty());
        assert_eq!(scene.canvas().attached(), 4);

        scene.set_visible(Category::GroundTruth, 0, true, &Selection::All);
        assert_eq!(scene.canvas().visible().len(), 2);
        assert!(scene.canvas_mut().take_dirty());
        assert!(!scene.canvas_mut().take_dirty());
    }

    #[test]
    fn test_eviction_drops_descendants() {
        let mut scene = scene();
        let source = source();
        scene.set_displayed_frame(0);
        scene.ensure_frame(Category::GroundTruth, 0, &source).unwrap();
        scene.set_visible(Category::GroundTruth, 0, true, &Selection::All);

        scene.ensure_frame(Category::GroundTruth, 1, &source).unwrap();
        scene.set_visible(Category::GroundTruth, 1, true, &Selection::All);
        assert_eq!(scene.canvas().attached(), 7);

        scene.set_displayed_frame(2);
        scene.ensure_frame(Category::GroundTruth, 2, &source).unwrap();
        assert!(!scene.is_resident(Category::GroundTruth, 0));
        assert!(!scene.is_resident(Category::GroundTruth, 1));
        assert!(scene.canvas().visible().is_empty());
        assert_eq!(scene.canvas().attached(), 4);
        assert_eq!(scene.canvas().child_count(root(&scene)), 1);
    }

    #[test]
    fn test_removal_walks_only_the_subtree() {
        let mut scene = scene();
        let source = source();
        scene.ensure_frame(Category::GroundTruth, 0, &source).unwrap();
        scene.ensure_frame(Category::GroundTruth, 1, &source).unwrap();
        scene.set_visible(Category::GroundTruth, 1, true, &Selection::All);

        let kept = scene.marker_ids(Category::GroundTruth, 1).unwrap();
        assert!(scene.evict(Category::GroundTruth, 0));
        assert_eq!(scene.canvas().attached(), 4);
        assert_eq!(scene.canvas().child_count(root(&scene)), 1);
        assert!(kept.iter().all(|id| scene.canvas().visible().contains(id)));

        assert!(scene.clear_category(Category::GroundTruth));
        assert_eq!(scene.canvas().attached(), 0);
        assert!(scene.canvas().visible().is_empty());
    }
}
