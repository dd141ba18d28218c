//! Background workers for opening files and reading frames.
//!
//! Each worker owns clones of the handles it needs and reports through the
//! channel; none of them touch the marker cache.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use vsvis_core::{FetchTicket, FrameSource};
use vsvis_io::{CoordinateSource, DataSource, Hdf5Store, Store};

use crate::message::AppMessage;

/// Opens an HDF5 file and lists every dataset in it.
pub fn open_file_worker(path: PathBuf, tx: &Sender<AppMessage>) {
    let start = Instant::now();
    let store = match Hdf5Store::open(&path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            let _ = tx.send(AppMessage::LoadError(e.to_string()));
            return;
        }
    };
    match store.list_datasets() {
        Ok(listing) => {
            info!(
                "listed {} datasets in {:.1}ms",
                listing.len(),
                start.elapsed().as_secs_f64() * 1000.0
            );
            let _ = tx.send(AppMessage::FileOpened {
                path,
                store,
                listing,
            });
        }
        Err(e) => {
            store.close();
            let _ = tx.send(AppMessage::LoadError(e.to_string()));
        }
    }
}

/// Reads one 2-D frame of the image stack.
pub fn load_image_worker(
    images: &DataSource,
    frame: usize,
    generation: u64,
    tx: &Sender<AppMessage>,
) {
    let result = i64::try_from(frame)
        .map_err(|_| format!("frame {frame} out of range"))
        .and_then(|index| images.request_2d(index).map_err(|e| e.to_string()));
    let msg = match result {
        Ok(image) => AppMessage::ImageLoaded {
            frame,
            generation,
            image,
        },
        Err(e) => AppMessage::LoadError(format!("image frame {frame}: {e}")),
    };
    let _ = tx.send(msg);
}

/// Reads the coordinates a fetch ticket asks for.
pub fn fetch_frame_worker(
    source: &CoordinateSource,
    session: u64,
    ticket: FetchTicket,
    tx: &Sender<AppMessage>,
) {
    let start = Instant::now();
    let result = source.fetch(ticket.frame());
    debug!(
        "{} frame {} read in {:.1}ms",
        ticket.category(),
        ticket.frame(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    let _ = tx.send(AppMessage::FrameLoaded {
        session,
        ticket,
        result,
    });
}
