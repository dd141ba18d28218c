//! UI rendering modules.
//!
//! Contains the UI rendering logic split into separate modules:
//! - `control_panel`: Left sidebar with frame, marker and view controls
//! - `main_view`: Central panel with the image frame and markers
//! - `tables`: Right panel with the per-category marker tables
//! - `inspector`: File inspection window assigning datasets to categories

mod control_panel;
mod inspector;
mod main_view;
mod tables;
pub mod theme;
