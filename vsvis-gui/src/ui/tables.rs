//! Marker tables: one tab per marker category, row selection drives marker
//! visibility.

use std::collections::BTreeSet;

use eframe::egui;
use egui_extras::{Column, TableBuilder};
use vsvis_core::Category;

use super::theme::{category_accent, stat_label, Palette};
use crate::app::ViewerApp;

/// Row of a marker table.
struct MarkerRow {
    key: usize,
    x: f64,
    y: f64,
    probability: Option<f32>,
    visible: bool,
}

/// Selection after clicking `row` with the given modifiers.
///
/// A plain click selects only `row`, a command click toggles it and a shift
/// click selects the range from `anchor`.
pub(crate) fn click_selection(
    current: &BTreeSet<usize>,
    row: usize,
    toggle: bool,
    extend: bool,
    anchor: Option<usize>,
) -> BTreeSet<usize> {
    match (extend, anchor) {
        (true, Some(anchor)) => {
            let mut next = if toggle { current.clone() } else { BTreeSet::new() };
            next.extend(anchor.min(row)..=anchor.max(row));
            next
        }
        _ if toggle => {
            let mut next = current.clone();
            if !next.remove(&row) {
                next.insert(row);
            }
            next
        }
        _ => BTreeSet::from([row]),
    }
}

/// Rows that became selected and rows that became deselected.
pub(crate) fn selection_delta(
    old: &BTreeSet<usize>,
    new: &BTreeSet<usize>,
) -> (Vec<usize>, Vec<usize>) {
    (
        new.difference(old).copied().collect(),
        old.difference(new).copied().collect(),
    )
}

impl ViewerApp {
    /// Render the right panel holding the marker tables.
    pub(crate) fn render_table_panel(&mut self, ctx: &egui::Context) {
        let colors = Palette::from_ctx(ctx);
        let categories: Vec<Category> = Category::MARKERS
            .into_iter()
            .filter(|&c| self.controller.has_source(c))
            .collect();
        if categories.is_empty() {
            return;
        }

        egui::SidePanel::right("tables")
            .default_width(300.0)
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_panel)
                    .inner_margin(egui::Margin::same(8.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    for &category in &categories {
                        let selected = self.ui_state.active_tab == category;
                        let text = egui::RichText::new(category.to_string())
                            .color(category_accent(category));
                        if ui.selectable_label(selected, text).clicked() && !selected {
                            self.activate_tab(category);
                        }
                    }
                });
                ui.separator();

                let category = self.ui_state.active_tab;
                if !categories.contains(&category) {
                    ui.label(stat_label("No data for this category"));
                    return;
                }
                ui.horizontal(|ui| {
                    if ui.button("Select all").clicked() {
                        self.select_rows(category, None);
                    }
                    if ui.button("Clear").clicked() {
                        self.select_rows(category, Some(BTreeSet::new()));
                    }
                });
                self.render_marker_table(ui, category);
            });
    }

    fn render_marker_table(&mut self, ui: &mut egui::Ui, category: Category) {
        let rows: Vec<MarkerRow> = match self.controller.markers(category) {
            Ok(Some(markers)) => markers
                .iter()
                .enumerate()
                .map(|(row, m)| MarkerRow {
                    key: m.key().unwrap_or(row),
                    x: m.x,
                    y: m.y,
                    probability: m.probability,
                    visible: m.visible,
                })
                .collect(),
            Ok(None) => {
                ui.label(stat_label("Loading..."));
                return;
            }
            Err(e) => {
                ui.label(stat_label(&e.to_string()));
                return;
            }
        };
        let selected = self
            .controller
            .selection(category)
            .cloned()
            .unwrap_or_default();
        let columns = category.columns();
        let mut clicked = None;

        TableBuilder::new(ui)
            .striped(true)
            .sense(egui::Sense::click())
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::auto().at_least(40.0))
            .columns(Column::remainder().at_least(60.0), columns.len())
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong("#");
                });
                for name in columns {
                    header.col(|ui| {
                        ui.strong(*name);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, rows.len(), |mut row| {
                    let marker = &rows[row.index()];
                    row.set_selected(selected.contains(&marker.key));
                    row.col(|ui| {
                        let label = egui::RichText::new(marker.key.to_string());
                        ui.label(if marker.visible { label.strong() } else { label.weak() });
                    });
                    row.col(|ui| {
                        ui.label(format!("{:.2}", marker.x));
                    });
                    row.col(|ui| {
                        ui.label(format!("{:.2}", marker.y));
                    });
                    if columns.len() > 2 {
                        row.col(|ui| {
                            ui.label(marker.probability.map_or_else(
                                || "-".to_string(),
                                |p| format!("{p:.3}"),
                            ));
                        });
                    }
                    if row.response().clicked() {
                        clicked = Some(marker.key);
                    }
                });
            });

        if let Some(key) = clicked {
            let modifiers = ui.input(|i| i.modifiers);
            let next = click_selection(
                &selected,
                key,
                modifiers.command,
                modifiers.shift,
                self.ui_state.anchor_row,
            );
            if !modifiers.shift {
                self.ui_state.anchor_row = Some(key);
            }
            self.select_rows(category, Some(next));
        }
    }

    /// Replace the selected rows of `category`; `None` selects every row.
    fn select_rows(&mut self, category: Category, rows: Option<BTreeSet<usize>>) {
        let old = self
            .controller
            .selection(category)
            .cloned()
            .unwrap_or_default();
        let new = match rows {
            Some(rows) => rows,
            None => match self.controller.markers(category) {
                Ok(Some(markers)) => markers
                    .iter()
                    .enumerate()
                    .map(|(row, m)| m.key().unwrap_or(row))
                    .collect(),
                _ => return,
            },
        };
        let (selected, deselected) = selection_delta(&old, &new);
        self.controller
            .toggle_by_selection(&selected, &deselected, category);
    }
}
