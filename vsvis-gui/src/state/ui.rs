//! UI state for panel visibility and view options.

use vsvis_core::Category;

use super::layout::LayoutTarget;

/// UI panel visibility and toggle state.
pub struct UiState {
    /// Whether the file inspection window is visible.
    pub show_inspector: bool,
    /// Marker category whose table is shown.
    pub active_tab: Category,
    /// Rows highlighted in the inspection window's dataset list.
    pub inspector_selection: Vec<usize>,
    /// Slot the inspection window assigns highlighted datasets to.
    pub assign_target: LayoutTarget,
    /// Frame shown by the slider; may run ahead of the loaded frame.
    pub slider_frame: usize,
    /// Last clicked table row, anchor for shift-click ranges.
    pub anchor_row: Option<usize>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            show_inspector: false,
            active_tab: Category::GroundTruth,
            inspector_selection: Vec::new(),
            assign_target: LayoutTarget::GroundTruth,
            slider_frame: 0,
            anchor_row: None,
        }
    }
}
