//! Main application state and logic.
//!
//! Contains the `ViewerApp` struct which owns the controller, the data
//! sources and the worker channel.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use eframe::egui;
use log::{debug, info, warn};
use ndarray::Array2;
use vsvis_core::{
    Category, Controller, DatasetShape, FetchOutcome, FetchTicket, FrameCoordinates, ViewerConfig,
};
use vsvis_io::{CoordinateSource, DataSource, Store};

use crate::message::AppMessage;
use crate::pipeline::{fetch_frame_worker, load_image_worker, open_file_worker};
use crate::state::{natural_cmp, DatasetLayout, ProcessingState, UiState, ViewerSources};
use crate::viewer::{generate_frame_image, Colormap, EguiCanvas};

/// Main application state.
pub struct ViewerApp {
    /// Viewer configuration, fixed for the lifetime of the app.
    pub(crate) config: ViewerConfig,
    /// Currently opened file.
    pub(crate) selected_file: Option<PathBuf>,
    /// Store of the opened file.
    pub(crate) store: Option<Arc<dyn Store>>,
    /// Every dataset of the opened file.
    pub(crate) listing: Vec<DatasetShape>,
    /// Datasets assigned to each category.
    pub(crate) layout: DatasetLayout,

    /// Frame navigation, selection and the marker cache.
    pub(crate) controller: Controller<EguiCanvas>,
    /// Image stack, shared with image workers.
    pub(crate) images: Option<DataSource>,
    /// Coordinate sources handed to fetch workers.
    pub(crate) workers: HashMap<Category, CoordinateSource>,
    /// Bumped whenever the sources are replaced; fetches of an older
    /// session are ignored.
    pub(crate) session: u64,

    /// Raw pixels of the displayed image.
    pub(crate) image: Option<Array2<f64>>,
    /// Bumped on every image request; older answers are dropped.
    pub(crate) image_generation: u64,
    /// Cached image texture.
    pub(crate) texture: Option<egui::TextureHandle>,
    /// Current colormap selection.
    pub(crate) colormap: Colormap,
    /// Whether intensities are log scaled before coloring.
    pub(crate) log_scale: bool,
    /// Pixel under the cursor and its value.
    pub(crate) cursor_info: Option<(usize, usize, f64)>,

    /// UI display state.
    pub(crate) ui_state: UiState,
    /// Message receiver for async operations.
    pub(crate) rx: Receiver<AppMessage>,
    /// Message sender for async operations.
    pub(crate) tx: Sender<AppMessage>,
    /// Loading state shown in the status bar.
    pub(crate) processing: ProcessingState,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig) -> Self {
        let (tx, rx) = channel();
        Self {
            controller: Controller::new(&config, EguiCanvas::new()),
            config,
            selected_file: None,
            store: None,
            listing: Vec::new(),
            layout: DatasetLayout::default(),
            images: None,
            workers: HashMap::new(),
            session: 0,
            image: None,
            image_generation: 0,
            texture: None,
            colormap: Colormap::default(),
            log_scale: false,
            cursor_info: None,
            ui_state: UiState::default(),
            rx,
            tx,
            processing: ProcessingState::default(),
        }
    }

    /// Open a file asynchronously.
    pub fn open_file(&mut self, path: PathBuf) {
        if !self.config.is_hdf5_path(&path.to_string_lossy()) {
            warn!("{} does not have an HDF5 extension", path.display());
        }
        self.close_file();
        self.processing.is_loading = true;
        self.processing.set_status(format!("Opening {}...", path.display()));

        let tx = self.tx.clone();
        thread::spawn(move || open_file_worker(path, &tx));
    }

    /// Drop every source and cached frame of the current file.
    pub fn close_file(&mut self) {
        self.detach_sources();
        if let Some(store) = self.store.take() {
            store.close();
        }
        self.selected_file = None;
        self.listing.clear();
        self.layout = DatasetLayout::default();
        self.ui_state = UiState::default();
    }

    fn detach_sources(&mut self) {
        self.controller = Controller::new(&self.config, EguiCanvas::new());
        self.images = None;
        self.workers.clear();
        self.session += 1;
        self.image = None;
        self.texture = None;
        self.cursor_info = None;
        self.image_generation += 1;
        self.processing.image_pending = false;
        self.processing.pending_fetches = 0;
    }

    /// Build sources from the current layout and show the first frame.
    pub fn apply_layout(&mut self, ctx: &egui::Context) {
        let Some(store) = self.store.clone() else {
            return;
        };
        self.detach_sources();
        let sources = match self.layout.build(&store) {
            Ok(sources) => sources,
            Err(e) => {
                self.processing.set_error(format!("Error: {e}"));
                return;
            }
        };
        if let Err(e) = self.attach_sources(sources) {
            self.processing.set_error(format!("Error: {e}"));
            return;
        }

        let frames = self.frame_count();
        info!("showing {frames} frames");
        self.processing.set_status(format!("{frames} frames"));
        self.ui_state.slider_frame = 0;
        self.ui_state.show_inspector = false;
        self.request_image(0);
        self.activate_tab(self.ui_state.active_tab);
        ctx.request_repaint();
    }

    fn attach_sources(&mut self, sources: ViewerSources) -> vsvis_core::Result<()> {
        let ViewerSources {
            images,
            ground_truth,
            predicted,
        } = sources;
        self.images = images;
        for (category, source) in [
            (Category::GroundTruth, ground_truth),
            (Category::Predicted, predicted),
        ] {
            let (Some(source), Some(style)) = (source, self.config.style(category)) else {
                continue;
            };
            let factory = style.factory();
            self.workers.insert(category, source.clone());
            self.controller.set_source(category, Box::new(source), factory)?;
        }
        Ok(())
    }

    /// Number of frames the slider spans.
    pub fn frame_count(&self) -> usize {
        let markers = self.controller.frame_count();
        let images = self.images.as_ref().map_or(0, DataSource::len);
        markers.max(images)
    }

    /// Move to `frame`; missing marker frames and the image are read on
    /// worker threads.
    pub fn go_to_frame(&mut self, frame: usize) {
        let tickets = if self.controller.frame_count() == 0 {
            Vec::new()
        } else {
            let last = self.controller.frame_count() - 1;
            match self.controller.begin_index(frame.min(last)) {
                Ok(tickets) => tickets,
                Err(e) => {
                    self.processing.set_error(format!("Error: {e}"));
                    return;
                }
            }
        };
        self.ui_state.anchor_row = None;
        for ticket in tickets {
            self.spawn_fetch(ticket);
        }
        self.request_image(frame);
    }

    fn spawn_fetch(&mut self, ticket: FetchTicket) {
        let Some(source) = self.workers.get(&ticket.category()).cloned() else {
            return;
        };
        self.processing.pending_fetches += 1;
        let session = self.session;
        let tx = self.tx.clone();
        thread::spawn(move || fetch_frame_worker(&source, session, ticket, &tx));
    }

    fn request_image(&mut self, frame: usize) {
        self.image_generation += 1;
        let Some(images) = self.images.clone() else {
            return;
        };
        if frame >= images.len() {
            self.image = None;
            self.texture = None;
            return;
        }
        self.processing.image_pending = true;
        let generation = self.image_generation;
        let tx = self.tx.clone();
        thread::spawn(move || load_image_worker(&images, frame, generation, &tx));
    }

    /// Show the table of `category` and its selected markers.
    pub fn activate_tab(&mut self, category: Category) {
        self.ui_state.active_tab = category;
        self.ui_state.anchor_row = None;
        let rows: Vec<usize> = self
            .controller
            .selection(category)
            .map(|rows| rows.iter().copied().collect())
            .unwrap_or_default();
        self.controller.tab_changed(category, &rows);
    }

    /// Re-color the current image, e.g. after a colormap change.
    pub fn refresh_texture(&mut self, ctx: &egui::Context) {
        if let Some(image) = &self.image {
            let color = generate_frame_image(image, self.colormap, self.log_scale);
            self.texture = Some(ctx.load_texture("frame", color, egui::TextureOptions::NEAREST));
        }
    }

    fn apply_fetch(&mut self, ticket: FetchTicket, result: vsvis_core::Result<FrameCoordinates>) {
        self.processing.pending_fetches = self.processing.pending_fetches.saturating_sub(1);
        match self.controller.complete_fetch(ticket, result) {
            Ok(FetchOutcome::Inserted) => {
                debug!("{} frame {} ready", ticket.category(), ticket.frame());
            }
            Ok(FetchOutcome::AlreadyResident | FetchOutcome::Discarded) => {}
            Err(e) => {
                self.processing.set_error(format!(
                    "Error reading {} frame {}: {e}",
                    ticket.category(),
                    ticket.frame()
                ));
            }
        }
    }

    /// Handle pending messages from async workers.
    pub fn handle_messages(&mut self, ctx: &egui::Context) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                AppMessage::FileOpened {
                    path,
                    store,
                    mut listing,
                } => {
                    listing.sort_by(|a, b| natural_cmp(&a.name, &b.name));
                    self.processing.is_loading = false;
                    self.processing.set_status(format!(
                        "Opened {} ({} datasets)",
                        path.display(),
                        listing.len()
                    ));
                    self.layout = DatasetLayout::detect(&listing);
                    self.listing = listing;
                    self.store = Some(store);
                    self.selected_file = Some(path);
                    self.ui_state.show_inspector = true;
                }
                AppMessage::ImageLoaded {
                    frame,
                    generation,
                    image,
                } => {
                    if generation != self.image_generation {
                        debug!("dropping superseded image for frame {frame}");
                        continue;
                    }
                    self.processing.image_pending = false;
                    self.image = Some(image);
                    self.refresh_texture(ctx);
                }
                AppMessage::FrameLoaded {
                    session,
                    ticket,
                    result,
                } => {
                    if session == self.session {
                        self.apply_fetch(ticket, result);
                    }
                }
                AppMessage::LoadError(e) => {
                    self.processing.is_loading = false;
                    self.processing.image_pending = false;
                    self.processing.set_error(format!("Error: {e}"));
                }
            }
        }
        if self.controller.scene_mut().canvas_mut().take_dirty() {
            ctx.request_repaint();
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        crate::ui::theme::apply_system_theme(ctx);
        self.handle_messages(ctx);
        self.render_top_panel(ctx);
        self.render_bottom_panel(ctx);
        self.render_side_panel(ctx);
        self.render_table_panel(ctx);
        self.render_central_panel(ctx);
        self.render_inspector_window(ctx);

        if self.processing.is_busy() {
            ctx.request_repaint();
        }
    }
}
