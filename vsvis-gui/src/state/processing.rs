//! Processing state for background operations.

/// Tracks the state of background file and frame loading.
pub struct ProcessingState {
    /// Whether a file is currently being opened.
    pub is_loading: bool,
    /// Marker fetches sent to workers and not yet answered.
    pub pending_fetches: usize,
    /// Whether the current image frame is still being read.
    pub image_pending: bool,
    /// User-facing status message.
    pub status_text: String,
    /// Whether `status_text` reports an error.
    pub is_error: bool,
}

impl Default for ProcessingState {
    fn default() -> Self {
        Self {
            is_loading: false,
            pending_fetches: 0,
            image_pending: false,
            status_text: "Ready".to_string(),
            is_error: false,
        }
    }
}

impl ProcessingState {
    /// Returns true while any worker is running.
    pub fn is_busy(&self) -> bool {
        self.is_loading || self.image_pending || self.pending_fetches > 0
    }

    /// Replaces the status line with an informational message.
    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status_text = text.into();
        self.is_error = false;
    }

    /// Replaces the status line with an error.
    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status_text = text.into();
        self.is_error = true;
    }
}
