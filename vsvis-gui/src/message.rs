//! Application message types for async communication.
//!
//! Messages are sent from background worker threads to the main UI thread
//! via channels. The UI thread is the only place the marker cache is mutated.

use std::path::PathBuf;
use std::sync::Arc;

use ndarray::Array2;
use vsvis_core::{DatasetShape, FetchTicket, FrameCoordinates};
use vsvis_io::Store;

/// Messages sent from background workers to the UI thread.
pub enum AppMessage {
    /// A file was opened and its structure listed.
    FileOpened {
        path: PathBuf,
        store: Arc<dyn Store>,
        listing: Vec<DatasetShape>,
    },

    /// An image frame was read. `generation` identifies the request so that
    /// superseded images can be dropped.
    ImageLoaded {
        frame: usize,
        generation: u64,
        image: Array2<f64>,
    },

    /// Coordinates for a pending marker fetch, or the error that stopped it.
    /// `session` is the source set the fetch was started for.
    FrameLoaded {
        session: u64,
        ticket: FetchTicket,
        result: vsvis_core::Result<FrameCoordinates>,
    },

    /// Opening or reading failed.
    LoadError(String),
}
