//! Control panel (left sidebar) and top/bottom bars rendering.

use eframe::egui::{self, Color32, FontFamily, FontId, Stroke};
use rfd::FileDialog;
use vsvis_core::Category;

use super::theme::{
    accent, category_accent, form_label, primary_button, stat_label, stat_value,
    stat_value_highlight, Palette,
};
use crate::app::ViewerApp;
use crate::viewer::Colormap;

impl ViewerApp {
    /// Render the top panel with branding, file info and file actions.
    pub(crate) fn render_top_panel(&mut self, ctx: &egui::Context) {
        let colors = Palette::from_ctx(ctx);

        egui::TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_header)
                    .inner_margin(egui::Margin::symmetric(16.0, 8.0)),
            )
            .show(ctx, |ui| {
                ui.set_min_height(32.0);
                ui.with_layout(egui::Layout::left_to_right(egui::Align::Center), |ui| {
                    ui.spacing_mut().item_spacing = egui::vec2(10.0, 0.0);
                    ui.label(
                        egui::RichText::new("VSVIS")
                            .font(FontId::new(14.0, FontFamily::Monospace))
                            .color(colors.text_primary)
                            .strong(),
                    );
                    ui.separator();

                    if ui
                        .add_enabled(!self.processing.is_loading, primary_button("Open"))
                        .clicked()
                    {
                        self.pick_file();
                    }
                    let has_file = self.store.is_some();
                    if ui
                        .add_enabled(has_file, egui::Button::new("Inspect"))
                        .clicked()
                    {
                        self.ui_state.show_inspector = true;
                    }
                    if ui.add_enabled(has_file, egui::Button::new("Close")).clicked() {
                        self.close_file();
                        self.processing.set_status("Ready");
                    }

                    if let Some(path) = &self.selected_file {
                        ui.label(
                            egui::RichText::new(path.display().to_string())
                                .size(11.0)
                                .color(colors.text_muted),
                        );
                    }
                });
            });
    }

    fn pick_file(&mut self) {
        let extensions: Vec<&str> = self
            .config
            .hdf5_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.'))
            .collect();
        if let Some(path) = FileDialog::new()
            .add_filter("HDF5", &extensions)
            .add_filter("All files", &["*"])
            .pick_file()
        {
            self.open_file(path);
        }
    }

    /// Render the bottom status bar.
    pub(crate) fn render_bottom_panel(&self, ctx: &egui::Context) {
        let colors = Palette::from_ctx(ctx);

        egui::TopBottomPanel::bottom("status_bar")
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_header)
                    .inner_margin(egui::Margin::symmetric(16.0, 6.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    self.render_status_indicator(ui);
                    ui.label(egui::RichText::new("│").color(colors.border_light));
                    self.render_cursor_status(ui, colors);
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let frames = self.frame_count();
                        if frames > 0 {
                            ui.label(
                                egui::RichText::new(format!(
                                    "frame {} / {}",
                                    self.ui_state.slider_frame + 1,
                                    frames
                                ))
                                .size(11.0)
                                .color(colors.text_muted),
                            );
                        }
                    });
                });
            });
    }

    fn render_status_indicator(&self, ui: &mut egui::Ui) {
        let status_color = if self.processing.is_error {
            accent::RED
        } else if self.processing.is_busy() {
            accent::BLUE
        } else {
            accent::GREEN
        };
        ui.label(egui::RichText::new("●").size(11.0).color(status_color));
        ui.label(
            egui::RichText::new(&self.processing.status_text)
                .size(11.0)
                .color(status_color),
        );
    }

    fn render_cursor_status(&self, ui: &mut egui::Ui, colors: Palette) {
        if let Some((x, y, value)) = self.cursor_info {
            ui.label(
                egui::RichText::new(format!("x {x}  y {y}  value {value:.4}"))
                    .size(11.0)
                    .color(colors.text_muted),
            );
        }
    }

    /// Render the left control panel.
    pub(crate) fn render_side_panel(&mut self, ctx: &egui::Context) {
        let colors = Palette::from_ctx(ctx);

        egui::SidePanel::left("ctrl")
            .default_width(250.0)
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_panel)
                    .inner_margin(egui::Margin::ZERO),
            )
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        self.render_section(ui, "Frame", true, |app, ui| {
                            app.render_frame_controls(ui);
                        });
                        self.render_section(ui, "Markers", true, |app, ui| {
                            app.render_marker_controls(ui);
                        });
                        self.render_section(ui, "View", true, |app, ui| {
                            app.render_view_options(ui);
                        });
                        self.render_section(ui, "Cache", false, |app, ui| {
                            app.render_cache_stats(ui);
                        });
                        ui.add_space(12.0);
                    });
            });
    }

    /// Render a collapsible section with header.
    fn render_section<F>(&mut self, ui: &mut egui::Ui, title: &str, default_open: bool, content: F)
    where
        F: FnOnce(&mut Self, &mut egui::Ui),
    {
        ui.push_id(title, |ui| {
            let colors = Palette::from_ui(ui);
            let header_height = ui.spacing().interact_size.y.max(28.0);
            let (header_rect, header_response) = ui.allocate_exact_size(
                egui::vec2(ui.available_width(), header_height),
                egui::Sense::click(),
            );

            let id = ui.make_persistent_id(format!("{title}_open"));
            let mut is_open = ui.data_mut(|d| *d.get_temp_mut_or_insert_with(id, || default_open));
            if header_response.clicked() {
                is_open = !is_open;
                ui.data_mut(|d| d.insert_temp(id, is_open));
            }

            let header_fill = if header_response.hovered() {
                colors.bg_header
            } else {
                Color32::TRANSPARENT
            };
            ui.painter().rect_filled(header_rect, 0.0, header_fill);
            ui.painter().text(
                header_rect.left_center() + egui::vec2(16.0, 0.0),
                egui::Align2::LEFT_CENTER,
                title.to_uppercase(),
                FontId::new(11.0, FontFamily::Proportional),
                colors.text_primary,
            );
            ui.painter().text(
                header_rect.right_center() - egui::vec2(16.0, 0.0),
                egui::Align2::CENTER_CENTER,
                if is_open { "▼" } else { "▶" },
                egui::FontId::monospace(10.0),
                colors.text_dim,
            );
            ui.painter().hline(
                header_rect.x_range(),
                header_rect.bottom(),
                Stroke::new(1.0, colors.border),
            );

            if is_open {
                egui::Frame::none()
                    .inner_margin(egui::Margin {
                        left: 16.0,
                        right: 16.0,
                        top: 12.0,
                        bottom: 16.0,
                    })
                    .show(ui, |ui| {
                        content(self, ui);
                    });
            }
        });
    }

    fn stat_row(ui: &mut egui::Ui, label: &str, value: &str, highlight: bool) {
        ui.horizontal(|ui| {
            ui.label(stat_label(label));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if highlight {
                    ui.label(stat_value_highlight(value));
                } else {
                    ui.label(stat_value(value));
                }
            });
        });
    }

    /// Frame slider with previous/next buttons.
    fn render_frame_controls(&mut self, ui: &mut egui::Ui) {
        let frames = self.frame_count();
        if frames == 0 {
            ui.label(stat_label("No frames loaded"));
            return;
        }
        let last = frames - 1;
        let mut frame = self.ui_state.slider_frame.min(last);

        ui.label(form_label("Frame"));
        ui.add_space(4.0);
        ui.add(egui::Slider::new(&mut frame, 0..=last));
        ui.horizontal(|ui| {
            if ui.add_enabled(frame > 0, egui::Button::new("◀ Prev")).clicked() {
                frame -= 1;
            }
            if ui.add_enabled(frame < last, egui::Button::new("Next ▶")).clicked() {
                frame += 1;
            }
        });

        if !ui.ctx().wants_keyboard_input() {
            ui.input(|i| {
                if i.key_pressed(egui::Key::ArrowLeft) {
                    frame = frame.saturating_sub(1);
                }
                if i.key_pressed(egui::Key::ArrowRight) {
                    frame = (frame + 1).min(last);
                }
            });
        }

        if frame != self.ui_state.slider_frame {
            self.ui_state.slider_frame = frame;
            self.go_to_frame(frame);
        }
    }

    /// Marker counts and the probability threshold.
    fn render_marker_controls(&mut self, ui: &mut egui::Ui) {
        let mut any = false;
        for category in Category::MARKERS {
            if !self.controller.has_source(category) {
                continue;
            }
            any = true;
            let (visible, total) = match self.controller.markers(category) {
                Ok(Some(markers)) => (markers.iter().filter(|m| m.visible).count(), markers.len()),
                _ => (0, 0),
            };
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("●").color(category_accent(category)));
                ui.label(stat_label(&category.to_string()));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(stat_value_highlight(&format!("{visible} / {total}")));
                });
            });
        }
        if !any {
            ui.label(stat_label("No marker datasets"));
            return;
        }

        if self.controller.has_source(Category::Predicted) {
            ui.add_space(8.0);
            ui.label(form_label("Probability threshold"));
            ui.add_space(4.0);
            let mut threshold = self.controller.threshold(Category::Predicted);
            let response = ui.add(egui::Slider::new(&mut threshold, 0.0..=1.0).step_by(0.01));
            if response.changed() {
                self.controller
                    .set_probability_threshold(Category::Predicted, threshold);
            }
        }
    }

    /// Render view options (colormap, log scale).
    fn render_view_options(&mut self, ui: &mut egui::Ui) {
        ui.label(form_label("Colormap"));
        ui.add_space(4.0);
        let mut colormap = self.colormap;
        egui::ComboBox::from_id_salt("colormap")
            .selected_text(colormap.to_string())
            .width(ui.available_width())
            .show_ui(ui, |ui| {
                for option in Colormap::ALL {
                    ui.selectable_value(&mut colormap, option, option.to_string());
                }
            });
        let mut log_scale = self.log_scale;
        ui.checkbox(&mut log_scale, "Log intensity");

        if colormap != self.colormap || log_scale != self.log_scale {
            self.colormap = colormap;
            self.log_scale = log_scale;
            self.refresh_texture(ui.ctx());
        }
    }

    /// Resident frames and hit/miss counters per marker category.
    fn render_cache_stats(&self, ui: &mut egui::Ui) {
        let scene = self.controller.scene();
        Self::stat_row(ui, "Buffer", &scene.buffer_size().to_string(), false);
        for category in Category::MARKERS {
            let Some(stats) = scene.stats(category) else {
                continue;
            };
            ui.add_space(4.0);
            ui.label(form_label(&category.to_string()));
            Self::stat_row(
                ui,
                "Resident",
                &scene.resident_count(category).to_string(),
                true,
            );
            Self::stat_row(ui, "Hits", &stats.hits.to_string(), false);
            Self::stat_row(ui, "Misses", &stats.misses.to_string(), false);
            Self::stat_row(ui, "Evictions", &stats.evictions.to_string(), false);
            Self::stat_row(ui, "Discarded", &stats.discarded.to_string(), false);
        }
    }
}
