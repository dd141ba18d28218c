//! Visualization modules for frame and marker display.

mod canvas;
mod colormap;
mod texture;

pub use canvas::EguiCanvas;
pub use colormap::Colormap;
pub use texture::generate_frame_image;
