//! File inspection window: lists the datasets of the opened file and assigns
//! them to viewer categories.

use eframe::egui;
use egui_extras::{Column, TableBuilder};

use super::theme::{form_label, primary_button, stat_label};
use crate::app::ViewerApp;
use crate::state::{DatasetLayout, LayoutTarget};

/// Last path component of a dataset name.
fn leaf_name(name: &str) -> &str {
    name.rsplit('/').find(|s| !s.is_empty()).unwrap_or(name)
}

fn format_shape(shape: &[usize]) -> String {
    if shape.is_empty() {
        return "scalar".to_string();
    }
    shape
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" x ")
}

impl ViewerApp {
    /// Render the file inspection window while it is open.
    pub(crate) fn render_inspector_window(&mut self, ctx: &egui::Context) {
        if !self.ui_state.show_inspector || self.store.is_none() {
            return;
        }
        let mut open = true;
        let mut apply = false;

        egui::Window::new("File Inspection")
            .open(&mut open)
            .default_size([760.0, 480.0])
            .show(ctx, |ui| {
                ui.columns(2, |cols| {
                    self.render_dataset_list(&mut cols[0]);
                    self.render_layout_lists(&mut cols[1]);
                });
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Auto-detect").clicked() {
                        self.layout = DatasetLayout::detect(&self.listing);
                    }
                    if ui.button("Clear").clicked() {
                        self.layout = DatasetLayout::default();
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        apply = ui
                            .add_enabled(!self.layout.is_empty(), primary_button("Apply"))
                            .clicked();
                    });
                });
            });

        if !open {
            self.ui_state.show_inspector = false;
        }
        if apply {
            self.apply_layout(ctx);
        }
    }

    fn render_dataset_list(&mut self, ui: &mut egui::Ui) {
        ui.label(form_label("Datasets"));
        ui.add_space(4.0);
        if self.listing.is_empty() {
            ui.label(stat_label("The file holds no datasets"));
            return;
        }

        let mut clicked = None;
        ui.push_id("datasets", |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .sense(egui::Sense::click())
                .max_scroll_height(320.0)
                .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                .column(Column::auto().at_least(80.0))
                .column(Column::remainder().at_least(120.0))
                .column(Column::auto().at_least(70.0))
                .header(20.0, |mut header| {
                    for title in ["Name", "Path", "Shape"] {
                        header.col(|ui| {
                            ui.strong(title);
                        });
                    }
                })
                .body(|body| {
                    body.rows(18.0, self.listing.len(), |mut row| {
                        let index = row.index();
                        let dataset = &self.listing[index];
                        row.set_selected(self.ui_state.inspector_selection.contains(&index));
                        row.col(|ui| {
                            ui.label(leaf_name(&dataset.name));
                        });
                        row.col(|ui| {
                            ui.label(&dataset.name);
                        });
                        row.col(|ui| {
                            ui.label(format_shape(&dataset.shape));
                        });
                        if row.response().clicked() {
                            clicked = Some(index);
                        }
                    });
                });
        });

        if let Some(index) = clicked {
            let selection = &mut self.ui_state.inspector_selection;
            if let Some(pos) = selection.iter().position(|&i| i == index) {
                selection.remove(pos);
            } else {
                selection.push(index);
            }
        }
    }

    fn render_layout_lists(&mut self, ui: &mut egui::Ui) {
        ui.label(form_label("Assign to"));
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            let target = &mut self.ui_state.assign_target;
            egui::ComboBox::from_id_salt("assign_target")
                .selected_text(target.to_string())
                .show_ui(ui, |ui| {
                    for option in LayoutTarget::ALL {
                        ui.selectable_value(target, option, option.to_string());
                    }
                });
            let has_selection = !self.ui_state.inspector_selection.is_empty();
            if ui
                .add_enabled(has_selection, egui::Button::new("Add selected"))
                .clicked()
            {
                self.assign_selection();
            }
        });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label(stat_label("Image axis"));
            ui.add(egui::DragValue::new(&mut self.layout.image_axis).range(0..=2));
        });

        let mut removed = None;
        egui::ScrollArea::vertical()
            .id_salt("layout_lists")
            .max_height(300.0)
            .show(ui, |ui| {
                for target in LayoutTarget::ALL {
                    let names = self.layout.list(target);
                    egui::CollapsingHeader::new(format!("{target} ({})", names.len()))
                        .id_salt(target.to_string())
                        .default_open(true)
                        .show(ui, |ui| {
                            if names.is_empty() {
                                ui.label(stat_label("None"));
                            }
                            for (pos, name) in names.iter().enumerate() {
                                ui.horizontal(|ui| {
                                    if ui.small_button("✕").clicked() {
                                        removed = Some((target, pos));
                                    }
                                    ui.label(name);
                                });
                            }
                        });
                }
            });

        if let Some((target, pos)) = removed {
            self.layout.list_mut(target).remove(pos);
        }
    }

    /// Assign the highlighted datasets, in listing order, to the chosen slot.
    fn assign_selection(&mut self) {
        let mut rows = std::mem::take(&mut self.ui_state.inspector_selection);
        rows.sort_unstable();
        let names: Vec<String> = rows
            .into_iter()
            .filter_map(|row| self.listing.get(row))
            .map(|d| d.name.clone())
            .collect();
        self.layout.assign(self.ui_state.assign_target, names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_name() {
        assert_eq!(leaf_name("/ground_truth/12"), "12");
        assert_eq!(leaf_name("/image/"), "image");
        assert_eq!(leaf_name("image"), "image");
    }

    #[test]
    fn test_format_shape() {
        assert_eq!(format_shape(&[4, 64, 64]), "4 x 64 x 64");
        assert_eq!(format_shape(&[]), "scalar");
    }
}
