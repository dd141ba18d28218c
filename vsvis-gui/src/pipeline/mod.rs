//! Background workers for file opening and frame loading.

mod loader;

pub use loader::{fetch_frame_worker, load_image_worker, open_file_worker};
