//! Central panel: view tabs and the per-view content.

use eframe::egui;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};
use lauepix_core::{IntegrationProfile, ViewKind};

use super::theme::{accent, form_label, primary_button, stat_label, stat_value, ThemeColors};
use crate::app::LauepixApp;
use crate::util::{u64_to_f64, usize_to_f64};

impl LauepixApp {
    /// Render the central panel with the view tabs.
    pub(crate) fn render_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_view_tabs(ui);
            ui.separator();

            match self.session.views().active() {
                ViewKind::ExperimentViewer => self.render_experiment_view(ui),
                ViewKind::ReciprocalLattice => self.render_lattice_view(ui),
                ViewKind::ExperimentPlanner => self.render_planner_view(ui),
                ViewKind::IntegrationProfiler => self.render_profiler_view(ui),
            }
        });
    }

    fn render_view_tabs(&mut self, ui: &mut egui::Ui) {
        let active = self.session.views().active();
        let mut picked = None;

        ui.horizontal(|ui| {
            for view in ViewKind::ALL {
                let response = ui.add_enabled(
                    self.session.is_view_enabled(view),
                    egui::SelectableLabel::new(active == view, view.label()),
                );
                if response.clicked() && active != view {
                    picked = Some(view);
                }
            }
        });

        if let Some(view) = picked {
            if let Err(e) = self.session.select_view(view) {
                log::warn!("{e}");
            }
        }
    }

    fn render_experiment_view(&mut self, ui: &mut egui::Ui) {
        let plot_height = (ui.available_height() * 0.55).max(200.0);
        self.render_line_plot(ui, plot_height);
        ui.separator();
        self.render_reflection_table(ui);
    }

    /// Observed spot positions on the detector, indexed spots drawn in accent.
    fn render_lattice_view(&mut self, ui: &mut egui::Ui) {
        let indexed_only = &mut self.session.views_mut().lattice.indexed_only;
        ui.checkbox(indexed_only, "Indexed reflections only");
        let indexed_only = *indexed_only;

        let registry = self.session.reflections();
        let total = registry.reflections().len();
        let indexed: Vec<[f64; 2]> = registry
            .reflections()
            .iter()
            .filter(|r| r.indexed)
            .filter_map(|r| r.observed)
            .map(|(x, y)| [x, y])
            .collect();
        let unindexed: Vec<[f64; 2]> = if indexed_only {
            Vec::new()
        } else {
            registry
                .reflections()
                .iter()
                .filter(|r| !r.indexed)
                .filter_map(|r| r.observed)
                .map(|(x, y)| [x, y])
                .collect()
        };
        let selected: Option<[f64; 2]> = registry
            .selected()
            .and_then(|id| registry.get(id))
            .filter(|r| r.indexed || !indexed_only)
            .and_then(|r| r.observed)
            .map(|(x, y)| [x, y]);

        egui::Grid::new("lattice_counts")
            .num_columns(2)
            .spacing([16.0, 4.0])
            .show(ui, |ui| {
                ui.label(stat_label("Reflections"));
                ui.label(stat_value(&total.to_string()));
                ui.end_row();
                ui.label(stat_label("Indexed"));
                ui.label(stat_value(&indexed.len().to_string()));
                ui.end_row();
            });

        let colors = ThemeColors::from_ui(ui);
        Plot::new("lattice_positions")
            .data_aspect(1.0)
            .x_axis_label("x (px)")
            .y_axis_label("y (px)")
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                if !unindexed.is_empty() {
                    plot_ui.points(
                        Points::new(unindexed)
                            .radius(2.0)
                            .color(colors.text_muted)
                            .name("Unindexed"),
                    );
                }
                plot_ui.points(
                    Points::new(indexed)
                        .radius(2.5)
                        .color(accent::BLUE)
                        .name("Indexed"),
                );
                if let Some(point) = selected {
                    plot_ui.points(
                        Points::new(vec![point])
                            .radius(5.0)
                            .color(accent::AMBER)
                            .name("Selected"),
                    );
                }
            });
    }

    fn render_planner_view(&mut self, ui: &mut egui::Ui) {
        let can_send = self.can_send();

        ui.horizontal(|ui| {
            if ui
                .add_enabled(can_send, primary_button("Store orientation"))
                .clicked()
            {
                self.store_planner_orientation();
            }
            if ui
                .add_enabled(can_send, egui::Button::new("Next best"))
                .clicked()
            {
                self.request_next_planner_orientation();
            }
            if ui.add_enabled(can_send, egui::Button::new("Clear")).clicked() {
                self.clear_planner();
            }
        });

        let planner = &self.session.views().planner;
        ui.label(form_label("Orientations"));
        egui::Grid::new("planner_orientations")
            .num_columns(3)
            .striped(true)
            .spacing([24.0, 4.0])
            .show(ui, |ui| {
                ui.label(stat_label("#"));
                ui.label(stat_label("Orientation (°)"));
                ui.label(stat_label("Reflections"));
                ui.end_row();
                let last = planner.orientations().len().saturating_sub(1);
                for (i, (orientation, count)) in planner
                    .orientations()
                    .iter()
                    .zip(planner.reflections())
                    .enumerate()
                {
                    let index = if i == last {
                        format!("{} (current)", i + 1)
                    } else {
                        (i + 1).to_string()
                    };
                    ui.label(stat_value(&index));
                    ui.label(stat_value(&format!("{orientation:.1}")));
                    ui.label(stat_value(&count.to_string()));
                    ui.end_row();
                }
            });

        let bars: Vec<Bar> = planner
            .reflections()
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                Bar::new(usize_to_f64(i + 1), u64_to_f64(count))
                    .width(0.6)
                    .fill(accent::BLUE)
            })
            .collect();
        Plot::new("planner_counts")
            .x_axis_label("Orientation")
            .y_axis_label("Reflections")
            .include_y(0.0)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name("Reflections"));
            });
    }

    fn render_profiler_view(&mut self, ui: &mut egui::Ui) {
        let Some(profile) = &self.session.views().profile else {
            ui.centered_and_justified(|ui| {
                ui.label(stat_label("Select a reflection to see its integrated profile"));
            });
            return;
        };

        ui.horizontal(|ui| {
            if !profile.title.is_empty() {
                ui.label(egui::RichText::new(&profile.title).strong());
            }
            if let Some(value) = profile.line_profile_value {
                ui.label(stat_label("I"));
                ui.label(stat_value(&format!("{value:.3}")));
            }
            if let Some(variance) = profile.line_profile_variance {
                ui.label(stat_label("σ²"));
                ui.label(stat_value(&format!("{variance:.3}")));
            }
        });

        Plot::new("integration_profile")
            .x_axis_label("ToF (µs)")
            .y_axis_label("Intensity")
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                for (values, name, color) in [
                    (&profile.intensity, "Intensity", accent::BLUE),
                    (&profile.background, "Background", accent::RED),
                    (&profile.line_profile, "Line profile", accent::GREEN),
                ] {
                    if let Some(points) = profile_points(profile, values) {
                        plot_ui.line(Line::new(points).color(color).name(name));
                    }
                }
            });
    }
}

/// Pair `values` with the profile's ToF axis; `None` if the series is absent.
fn profile_points(profile: &IntegrationProfile, values: &[f64]) -> Option<PlotPoints> {
    if values.is_empty() {
        return None;
    }
    Some(PlotPoints::new(
        profile
            .tof
            .iter()
            .zip(values)
            .map(|(&x, &y)| [x, y])
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_points_pair_with_tof() {
        let profile = IntegrationProfile {
            tof: vec![1.0, 2.0, 3.0],
            intensity: vec![10.0, 20.0, 15.0],
            ..Default::default()
        };
        let points = profile_points(&profile, &profile.intensity).map(|p| p.points().len());
        assert_eq!(points, Some(3));
        assert!(profile_points(&profile, &profile.background).is_none());
    }
}
