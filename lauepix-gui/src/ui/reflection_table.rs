//! Reflection table shown under the experiment plot.

use eframe::egui;
use egui_extras::{Column, TableBuilder};

use super::theme::stat_label;
use crate::app::LauepixApp;

const HEADERS: [&str; 8] = [
    "ID",
    "Panel",
    "Panel name",
    "Miller index",
    "XYZ obs",
    "XYZ cal",
    "Wavelength (Å)",
    "ToF (µs)",
];

const ROW_HEIGHT: f32 = 18.0;

impl LauepixApp {
    /// Render the reflection table; clicking a row selects that reflection.
    pub(crate) fn render_reflection_table(&mut self, ui: &mut egui::Ui) {
        if !self.session.reflection_table_enabled() {
            ui.label(stat_label("Reflections appear once spot finding has run."));
            return;
        }

        let registry = self.session.reflections();
        let rows = registry.reflections();
        let scroll_row = if self.ui_state.scroll_to_selection {
            registry.selected().and_then(|id| registry.row_of(id))
        } else {
            None
        };

        let mut clear = false;
        ui.horizontal(|ui| {
            ui.label(stat_label(&format!("{} reflections", rows.len())));
            clear = ui
                .add_enabled(
                    registry.selected().is_some(),
                    egui::Button::new("Clear selection").small(),
                )
                .clicked();
        });

        let mut clicked = None;
        let mut table = TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .sense(egui::Sense::click())
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::auto().at_least(48.0))
            .columns(Column::auto().at_least(64.0), HEADERS.len() - 2)
            .column(Column::remainder())
            .min_scrolled_height(0.0);
        if let Some(row) = scroll_row {
            table = table.scroll_to_row(row, Some(egui::Align::Center));
        }

        table
            .header(20.0, |mut header| {
                for title in HEADERS {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                    let reflection = &rows[row.index()];
                    row.set_selected(registry.is_selected(&reflection.id));
                    for cell in [
                        reflection.id.as_str(),
                        reflection.panel.as_str(),
                        reflection.panel_name.as_str(),
                        reflection.miller_idx.as_str(),
                        reflection.xyz_obs.as_str(),
                        reflection.xyz_cal.as_str(),
                        reflection.wavelength.as_str(),
                        reflection.tof.as_str(),
                    ] {
                        row.col(|ui| {
                            ui.label(cell);
                        });
                    }
                    if row.response().clicked() {
                        clicked = Some(reflection.id.clone());
                    }
                });
            });

        self.ui_state.scroll_to_selection = false;
        if let Some(id) = clicked {
            self.session.select_reflection(id);
        } else if clear {
            self.session.clear_selection();
        }
    }
}
