//! Main view (central panel) rendering.

use std::collections::HashMap;

use eframe::egui;
use egui_plot::{Legend, MarkerShape, Plot, PlotImage, PlotPoint, PlotPoints, Points};
use vsvis_core::{Category, Color, Shape};

use super::theme::marker_color;
use crate::app::ViewerApp;
use crate::util::{f64_to_usize_bounded, usize_to_f32, usize_to_f64};

/// Style of a batch of markers; the size is kept as bits so the key is `Eq`.
type BatchKey = (Category, Shape, Color, bool, u32);

/// Visible markers sharing one category and style, in plot coordinates.
type MarkerBatches = HashMap<BatchKey, Vec<[f64; 2]>>;

/// Plot y grows upwards; image rows grow downwards.
fn to_plot(x: f64, y: f64) -> [f64; 2] {
    [x, -y]
}

impl ViewerApp {
    /// Group the markers on the canvas render list by style.
    fn visible_marker_batches(&self) -> MarkerBatches {
        let scene = self.controller.scene();
        let tree = scene.tree();
        let mut batches = MarkerBatches::new();
        for &id in scene.canvas().visible() {
            let Some(marker) = tree.marker(id) else {
                continue;
            };
            // marker -> frame subgroup -> top-level group
            let root = tree.parent(id).and_then(|group| tree.parent(group));
            let Some(category) = Category::MARKERS
                .into_iter()
                .find(|&c| root.is_some() && scene.top_level_group(c) == root)
            else {
                continue;
            };
            batches
                .entry((
                    category,
                    marker.shape,
                    marker.color,
                    marker.filled,
                    marker.size.to_bits(),
                ))
                .or_default()
                .push(to_plot(marker.x, marker.y));
        }
        batches
    }

    /// Render the central panel with the image frame and visible markers.
    pub(crate) fn render_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.texture.is_none() && self.controller.frame_count() == 0 {
                ui.centered_and_justified(|ui| ui.label("No Data"));
                return;
            }
            let batches = self.visible_marker_batches();
            let dims = self.image.as_ref().map(ndarray::Array2::dim);

            let response = Plot::new("frame_plot")
                .data_aspect(1.0)
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    if let (Some(tex), Some((rows, cols))) = (&self.texture, dims) {
                        let (w, h) = (usize_to_f64(cols), usize_to_f64(rows));
                        // pixel (0, 0) is centered on the origin
                        plot_ui.image(PlotImage::new(
                            tex,
                            PlotPoint::new(w / 2.0 - 0.5, -(h / 2.0 - 0.5)),
                            [usize_to_f32(cols), usize_to_f32(rows)],
                        ));
                    }

                    for ((category, shape, color, filled, size), points) in batches {
                        let marker_shape = match shape {
                            Shape::Circle => MarkerShape::Circle,
                            Shape::Diamond => MarkerShape::Diamond,
                        };
                        plot_ui.points(
                            Points::new(PlotPoints::new(points))
                                .shape(marker_shape)
                                .radius(f32::from_bits(size))
                                .color(marker_color(color))
                                .filled(filled)
                                .name(category.to_string()),
                        );
                    }

                    plot_ui.pointer_coordinate()
                });

            self.cursor_info = response.inner.and_then(|pos| {
                let (rows, cols) = dims?;
                let col = f64_to_usize_bounded(pos.x + 0.5, cols)?;
                let row = f64_to_usize_bounded(-pos.y + 0.5, rows)?;
                let value = self.image.as_ref()?[[row, col]];
                Some((col, row, value))
            });
        });
    }
}
