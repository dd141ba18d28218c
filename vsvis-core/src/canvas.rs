//! Rendering canvas interface driven by the scene cache.
//!
//! The scene never draws anything itself; it reports structural and
//! visibility changes to a [`Canvas`], which a front end turns into pixels.

use crate::tree::NodeId;

/// Receiver of scene graph changes.
pub trait Canvas {
    /// `item` was attached under `parent` (`None` for the canvas root).
    fn add_child(&mut self, item: NodeId, parent: Option<NodeId>);

    /// `item` and everything below it were removed.
    fn remove_child(&mut self, item: NodeId);

    /// Visibility of a single marker changed.
    fn set_visible(&mut self, item: NodeId, visible: bool);
}

/// Canvas that ignores every change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCanvas;

impl Canvas for NullCanvas {
    fn add_child(&mut self, _item: NodeId, _parent: Option<NodeId>) {}

    fn remove_child(&mut self, _item: NodeId) {}

    fn set_visible(&mut self, _item: NodeId, _visible: bool) {}
}

/// One change reported to a [`RecordingCanvas`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasEvent {
    Added {
        item: NodeId,
        parent: Option<NodeId>,
    },
    Removed(NodeId),
    Visibility {
        item: NodeId,
        visible: bool,
    },
}

/// Canvas that keeps a log of every change, mainly for tests and tooling.
#[derive(Debug, Default, Clone)]
pub struct RecordingCanvas {
    pub events: Vec<CanvasEvent>,
}

impl RecordingCanvas {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of visibility changes recorded so far.
    #[must_use]
    pub fn visibility_changes(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, CanvasEvent::Visibility { .. }))
            .count()
    }

    /// Drops all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Canvas for RecordingCanvas {
    fn add_child(&mut self, item: NodeId, parent: Option<NodeId>) {
        self.events.push(CanvasEvent::Added { item, parent });
    }

    fn remove_child(&mut self, item: NodeId) {
        self.events.push(CanvasEvent::Removed(item));
    }

    fn set_visible(&mut self, item: NodeId, visible: bool) {
        self.events.push(CanvasEvent::Visibility { item, visible });
    }
}
