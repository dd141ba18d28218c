#![cfg(feature = "hdf5")]
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
//! End-to-end: HDF5 file -> data sources -> controller.

use std::path::Path;
use std::sync::Arc;

use hdf5::File;
use tempfile::NamedTempFile;
use vsvis_core::{Category, Controller, ViewerConfig};
use vsvis_io::{CoordinateSource, DataSource, Hdf5Store, Store};

const FRAMES: usize = 3;

// Same layout the viewer expects: an image stack plus per-frame coordinate
// and probability datasets.
fn write_detections(path: &Path) {
    let file = File::create(path).unwrap();
    let image = file.create_group("image").unwrap();
    let pixels: Vec<u16> = (0..FRAMES * 8 * 8).map(|v| (v % 4096) as u16).collect();
    image
        .new_dataset::<u16>()
        .shape((FRAMES, 8, 8))
        .create("data")
        .unwrap()
        .write_raw(&pixels)
        .unwrap();

    let gt = file.create_group("ground_truth").unwrap();
    let predicted = file.create_group("predicted").unwrap();
    let coords = predicted.create_group("coordinates").unwrap();
    let probs = predicted.create_group("probabilities").unwrap();
    for frame in 0..FRAMES {
        let n = frame + 2;
        let xy: Vec<f32> = (0..n * 2).map(|v| (frame * 100 + v) as f32).collect();
        let p: Vec<f32> = (0..n).map(|v| v as f32 / n as f32).collect();
        let name = frame.to_string();
        gt.new_dataset::<f32>()
            .shape((n, 2))
            .create(name.as_str())
            .unwrap()
            .write_raw(&xy)
            .unwrap();
        coords
            .new_dataset::<f32>()
            .shape((n, 2))
            .create(name.as_str())
            .unwrap()
            .write_raw(&xy)
            .unwrap();
        probs
            .new_dataset::<f32>()
            .shape((n,))
            .create(name.as_str())
            .unwrap()
            .write_raw(&p)
            .unwrap();
    }
}

fn names(prefix: &str) -> Vec<String> {
    (0..FRAMES).map(|i| format!("{prefix}/{i}")).collect()
}

#[test]
fn test_hdf5_sources_drive_controller() {
    let file = NamedTempFile::new().unwrap();
    write_detections(file.path());
    let store: Arc<dyn Store> = Arc::new(Hdf5Store::open(file.path()).unwrap());

    let images = DataSource::flat(store.clone(), &["/image/data"], Some(0)).unwrap();
    assert_eq!(images.len(), FRAMES);
    assert_eq!(images.request_2d(1).unwrap().dim(), (8, 8));

    let gt = DataSource::flat(store.clone(), &names("/ground_truth"), None).unwrap();
    let predicted = DataSource::zipped(
        store.clone(),
        &[
            names("/predicted/coordinates"),
            names("/predicted/probabilities"),
        ],
    )
    .unwrap();

    let config = ViewerConfig::default();
    let mut controller = Controller::headless(&config);
    controller
        .set_source(
            Category::GroundTruth,
            Box::new(CoordinateSource::new(gt)),
            config.ground_truth.factory(),
        )
        .unwrap();
    controller
        .set_source(
            Category::Predicted,
            Box::new(CoordinateSource::new(predicted)),
            config.predicted.factory(),
        )
        .unwrap();

    controller.set_index(2).unwrap();
    let markers = controller.markers(Category::Predicted).unwrap().unwrap();
    assert_eq!(markers.len(), 4);
    assert_eq!(markers[1].position(), (202.0, 203.0));
    assert_eq!(markers[3].probability, Some(0.75));

    controller.tab_changed(Category::Predicted, &[0, 1, 2, 3]);
    controller.set_probability_threshold(Category::Predicted, 0.5);
    let visible = controller
        .markers(Category::Predicted)
        .unwrap()
        .unwrap()
        .iter()
        .filter(|m| m.visible)
        .count();
    assert_eq!(visible, 2);

    images.close();
    assert!(!store.is_open());
}

#[test]
fn test_listing_matches_layout() {
    let file = NamedTempFile::new().unwrap();
    write_detections(file.path());
    let store = Hdf5Store::open(file.path()).unwrap();
    let listing = store.list_datasets().unwrap();
    assert_eq!(listing.len(), 1 + 3 * FRAMES);
    let image = listing.iter().find(|d| d.name == "/image/data").unwrap();
    assert_eq!(image.shape, vec![FRAMES, 8, 8]);
}
