//! Application state modules.

mod layout;
mod processing;
mod ui;

pub use layout::{natural_cmp, DatasetLayout, LayoutTarget, ViewerSources};
pub use processing::ProcessingState;
pub use ui::UiState;
