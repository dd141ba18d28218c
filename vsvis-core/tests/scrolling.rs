#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
//! Scrolling through long frame sequences with bounded scene memory.

use std::collections::BTreeSet;

use vsvis_core::{
    CanvasEvent, Category, Controller, DatasetIndex, DatasetShape, EvictionPolicy, Error,
    FrameCoordinates, FrameSource, MarkerFactory, RecordingCanvas, Result, ViewerConfig,
};

/// Frame source backed by a flat index over several "files" of rows.
struct IndexedSource {
    index: DatasetIndex,
    points_per_frame: usize,
}

impl FrameSource for IndexedSource {
    fn len(&self) -> usize {
        self.index.total_length()
    }

    fn fetch(&self, frame: usize) -> Result<FrameCoordinates> {
        let slice = self.index.lookup(frame as i64)?;
        let points = (0..self.points_per_frame)
            .map(|i| [slice.position as f64, (slice.offset() * 10 + i) as f64])
            .collect();
        FrameCoordinates::new(points, None)
    }
}

fn indexed(lengths: &[usize], points_per_frame: usize) -> Box<dyn FrameSource> {
    let shapes: Vec<_> = lengths
        .iter()
        .enumerate()
        .map(|(i, &len)| DatasetShape::new(format!("/ground_truth/{i}"), vec![len, 2]))
        .collect();
    Box::new(IndexedSource {
        index: DatasetIndex::build(&shapes, Some(0)).unwrap(),
        points_per_frame,
    })
}

#[test]
fn test_scrolling_keeps_cache_bounded() {
    let config = ViewerConfig::default().with_buffer_size(50);
    let mut controller = Controller::new(&config, RecordingCanvas::new());
    controller
        .set_source(Category::GroundTruth, indexed(&[30, 20, 25], 4), MarkerFactory::default())
        .unwrap();
    assert_eq!(controller.frame_count(), 75);

    for frame in 0..60 {
        controller.set_index(frame).unwrap();
        let scene = controller.scene();
        assert!(scene.resident_count(Category::GroundTruth) <= 50);
        assert!(scene.is_resident(Category::GroundTruth, frame));
    }
    assert!(controller.scene().stats(Category::GroundTruth).unwrap().evictions > 0);
}

#[test]
fn test_markers_follow_dataset_boundaries() {
    let mut controller = Controller::headless(&ViewerConfig::default());
    controller
        .set_source(Category::GroundTruth, indexed(&[3, 2], 1), MarkerFactory::default())
        .unwrap();

    controller.set_index(3).unwrap();
    let markers = controller.markers(Category::GroundTruth).unwrap().unwrap();
    // frame 3 is the first row of the second dataset
    assert_eq!(markers[0].position(), (1.0, 0.0));

    controller.set_index(2).unwrap();
    let markers = controller.markers(Category::GroundTruth).unwrap().unwrap();
    assert_eq!(markers[0].position(), (0.0, 20.0));

    assert!(matches!(
        controller.set_index(5),
        Err(Error::IndexOutOfRange { index: 5, len: 5 })
    ));
}

#[test]
fn test_random_eviction_never_drops_displayed_frame() {
    let config = ViewerConfig::default()
        .with_buffer_size(8)
        .with_eviction(EvictionPolicy::Random)
        .with_seed(3);
    let mut controller = Controller::headless(&config);
    controller
        .set_source(Category::GroundTruth, indexed(&[100], 2), MarkerFactory::default())
        .unwrap();

    for frame in (0..100).rev() {
        controller.set_index(frame).unwrap();
        assert!(controller.scene().is_resident(Category::GroundTruth, frame));
        assert!(controller.scene().resident_count(Category::GroundTruth) <= 8);
    }
}

#[test]
fn test_selection_drives_canvas_visibility() {
    let mut controller = Controller::new(&ViewerConfig::default(), RecordingCanvas::new());
    controller
        .set_source(Category::GroundTruth, indexed(&[4], 6), MarkerFactory::default())
        .unwrap();
    controller.scene_mut().canvas_mut().clear();

    controller.toggle_by_selection(&[1, 2, 5], &[2], Category::GroundTruth);
    controller.toggle_by_selection(&[1], &[], Category::GroundTruth);

    let shown: BTreeSet<_> = controller
        .scene()
        .canvas()
        .events
        .iter()
        .filter_map(|e| match e {
            CanvasEvent::Visibility { item, visible: true } => Some(*item),
            _ => None,
        })
        .collect();
    assert_eq!(shown.len(), 2);
    assert_eq!(controller.scene().canvas().visibility_changes(), 2);
}
