//! Experiment line plot with reflection overlays and rubber-band zoom.
//!
//! The plot's own navigation is disabled. A primary-button drag draws a
//! band over the x axis and zooms to it on release; a click selects the
//! reflection whose region lies under the pointer.

use eframe::egui::{self, Color32, Stroke};
use egui_plot::{Line, Plot, PlotBounds, PlotPoint, PlotPoints, Points, Polygon, Text};
use lauepix_core::{ZoomOutcome, ZoomWindow};

use super::theme::{accent, stat_label, ThemeColors};
use crate::app::LauepixApp;

impl LauepixApp {
    pub(crate) fn render_line_plot(&mut self, ui: &mut egui::Ui, height: f32) {
        let colors = ThemeColors::from_ui(ui);
        let plot = &self.session.views().experiment;
        let reflections = self.session.reflections();

        let mut zoom_out = false;
        ui.horizontal(|ui| {
            let title = if plot.title().is_empty() {
                "Experiment"
            } else {
                plot.title()
            };
            ui.label(egui::RichText::new(title).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                zoom_out = ui
                    .add_enabled(plot.can_zoom_out(), egui::Button::new("Zoom out"))
                    .clicked();
            });
        });

        if plot.series().is_empty() {
            ui.allocate_ui(egui::vec2(ui.available_width(), height), |ui| {
                ui.centered_and_justified(|ui| ui.label(stat_label("No Data")));
            });
            if zoom_out {
                self.session.views_mut().experiment.zoom_out();
            }
            return;
        }

        let line: Vec<[f64; 2]> = plot.series().samples().iter().map(|s| [s.x, s.y]).collect();
        let window = plot.window();
        let band = plot.drag_band();
        let highlighted = plot.highlighted_region(reflections).map(|r| r.id.clone());

        let response = Plot::new("experiment_lineplot")
            .height(height)
            .x_axis_label("ToF (µs)")
            .y_axis_label("Intensity")
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .allow_double_click_reset(false)
            .show(ui, |plot_ui| {
                plot_ui.set_plot_bounds(display_bounds(window));

                for region in plot.regions() {
                    let selected = highlighted.as_ref() == Some(&region.id);
                    let color = if selected { accent::AMBER } else { accent::GREEN };
                    plot_ui.polygon(
                        Polygon::new(band_points(region.x1, region.x2, window))
                            .fill_color(color.gamma_multiply(if selected { 0.35 } else { 0.12 }))
                            .stroke(Stroke::new(if selected { 1.5 } else { 0.5 }, color)),
                    );
                }

                plot_ui.line(
                    Line::new(PlotPoints::new(line))
                        .color(accent::BLUE)
                        .width(1.5)
                        .name("Intensity"),
                );

                for point in plot.points() {
                    let selected = reflections.is_selected(&point.id);
                    let color = if selected { accent::AMBER } else { colors.text_primary };
                    plot_ui.points(
                        Points::new(vec![[point.x, point.y]])
                            .radius(if selected { 4.0 } else { 2.5 })
                            .color(color),
                    );
                    if let Some(label) = point.label() {
                        plot_ui.text(
                            Text::new(PlotPoint::new(point.x, point.y), label)
                                .color(colors.text_muted)
                                .anchor(egui::Align2::CENTER_BOTTOM),
                        );
                    }
                }

                if let Some((from, to)) = band {
                    plot_ui.polygon(
                        Polygon::new(band_points(from, to, window))
                            .fill_color(Color32::from_white_alpha(24))
                            .stroke(Stroke::new(1.0, colors.text_muted)),
                    );
                }
            });

        let r = &response.response;
        let pointer_x = r
            .interact_pointer_pos()
            .or_else(|| r.hover_pos())
            .map(|pos| response.transform.value_from_position(pos).x);

        let experiment = &mut self.session.views_mut().experiment;
        if zoom_out {
            experiment.zoom_out();
        }
        if r.drag_started_by(egui::PointerButton::Primary) {
            experiment.pointer_down(pointer_x);
        } else if r.dragged_by(egui::PointerButton::Primary) {
            experiment.pointer_move(pointer_x);
        }
        if r.drag_stopped_by(egui::PointerButton::Primary) {
            match experiment.pointer_up() {
                ZoomOutcome::Zoomed => log::debug!("zoomed to {:?}", experiment.window().x),
                ZoomOutcome::TooNarrow => log::debug!("zoom band too narrow"),
                ZoomOutcome::Cancelled => {}
            }
        }

        if r.clicked() {
            if let Some(x) = pointer_x {
                if let Some(id) = self.session.click_plot(x) {
                    log::debug!("selected reflection {id}");
                    self.ui_state.scroll_to_selection = true;
                }
            }
        }
    }
}

/// Rectangle spanning `[x1, x2]` over the full height of the window.
fn band_points(x1: f64, x2: f64, window: ZoomWindow) -> Vec<[f64; 2]> {
    let (bottom, top) = (window.y.min, window.y.max);
    vec![[x1, bottom], [x2, bottom], [x2, top], [x1, top]]
}

/// Plot bounds for a window; a degenerate axis is widened so the plot stays drawable.
fn display_bounds(window: ZoomWindow) -> PlotBounds {
    let widen = |min: f64, max: f64| {
        if max > min {
            (min, max)
        } else {
            (min - 0.5, min + 0.5)
        }
    };
    let (x_min, x_max) = widen(window.x.min, window.x.max);
    let (y_min, y_max) = widen(window.y.min, window.y.max);
    PlotBounds::from_min_max([x_min, y_min], [x_max, y_max])
}
