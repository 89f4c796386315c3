//! Stage panels (left sidebar): run controls, options and logs.

use std::ops::RangeInclusive;

use eframe::egui::{self, Stroke};
use lauepix_core::{markup_to_plain, Stage, StageStatus};
use rfd::FileDialog;

use super::theme::{accent, form_label, primary_button, stat_label, stop_button, ThemeColors};
use crate::app::LauepixApp;
use crate::state::ThresholdAlgorithm;

impl LauepixApp {
    /// Render the left panel with the stage tabs and the active stage's controls.
    pub(crate) fn render_side_panel(&mut self, ctx: &egui::Context) {
        let colors = ThemeColors::from_ctx(ctx);

        egui::SidePanel::left("stage_panel")
            .resizable(true)
            .default_width(340.0)
            .min_width(280.0)
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_panel)
                    .inner_margin(egui::Margin::same(12.0)),
            )
            .show(ctx, |ui| {
                self.render_stage_tabs(ui);
                ui.separator();

                let stage = self.ui_state.active_stage;
                self.render_run_controls(ui, stage);
                match stage {
                    Stage::Import => self.render_import_panel(ui),
                    Stage::FindSpots => self.render_find_spots_panel(ui),
                    Stage::Index | Stage::Refine | Stage::Integrate => {}
                }
                self.render_advanced_options(ui, stage);
                self.render_stage_log(ui, stage);
            });
    }

    fn render_stage_tabs(&mut self, ui: &mut egui::Ui) {
        let colors = ThemeColors::from_ui(ui);
        ui.horizontal_wrapped(|ui| {
            for stage in Stage::ALL {
                let status = self.session.stages().status(stage);
                let text = egui::RichText::new(stage.label()).color(colors.stage(status));
                let selected = self.ui_state.active_stage == stage;
                let response = ui.add_enabled(
                    status != StageStatus::Disabled,
                    egui::SelectableLabel::new(selected, text),
                );
                if response.clicked() {
                    self.ui_state.active_stage = stage;
                }
            }
        });
    }

    fn render_run_controls(&mut self, ui: &mut egui::Ui, stage: Stage) {
        let status = self.session.stages().status(stage);
        let can_send = self.can_send();

        ui.horizontal(|ui| {
            ui.label(form_label(stage.label()));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                match status {
                    StageStatus::Running => {
                        if ui.add_enabled(can_send, stop_button("Stop")).clicked() {
                            self.cancel_stage(stage);
                        }
                        ui.spinner();
                    }
                    StageStatus::Idle | StageStatus::Disabled if stage != Stage::Import => {
                        let enabled = status == StageStatus::Idle && can_send;
                        if ui.add_enabled(enabled, primary_button("Run")).clicked() {
                            self.run_stage(stage);
                        }
                    }
                    StageStatus::Idle | StageStatus::Disabled => {}
                }
            });
        });
        ui.add_space(6.0);
    }

    fn render_import_panel(&mut self, ui: &mut egui::Ui) {
        let idle = self.session.stages().status(Stage::Import) == StageStatus::Idle;
        let enabled = idle && self.can_send();

        ui.horizontal(|ui| {
            if ui.add_enabled(enabled, primary_button("Open file...")).clicked() {
                if let Some(path) = FileDialog::new()
                    .set_title("Import experiment")
                    .pick_file()
                {
                    self.import_file(path);
                }
            }
            if ui
                .add_enabled(enabled, egui::Button::new("Browse on server"))
                .clicked()
            {
                self.browse_for_import();
            }
        });

        if let Some(error) = &self.ui_state.import_error {
            ui.colored_label(accent::RED, error);
        }
        ui.add_space(6.0);
    }

    fn render_find_spots_panel(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;
        let params = &mut self.ui_state.find_spots;

        egui::Grid::new("find_spots_params")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label(form_label("Algorithm"));
                egui::ComboBox::from_id_salt("threshold_algorithm")
                    .selected_text(params.algorithm.label())
                    .show_ui(ui, |ui| {
                        for algorithm in ThresholdAlgorithm::ALL {
                            changed |= ui
                                .selectable_value(&mut params.algorithm, algorithm, algorithm.label())
                                .changed();
                        }
                    });
                ui.end_row();

                match params.algorithm {
                    ThresholdAlgorithm::Dispersion => {
                        changed |= param_row(ui, "Gain", &mut params.gain, 0.05, 0.0..=100.0);
                        changed |= param_row(
                            ui,
                            "Sigma strong",
                            &mut params.sigma_strong,
                            0.1,
                            0.0..=100.0,
                        );
                        changed |= param_row(
                            ui,
                            "Sigma background",
                            &mut params.sigma_background,
                            0.1,
                            0.0..=100.0,
                        );
                        changed |= param_row(
                            ui,
                            "Global threshold",
                            &mut params.global_threshold,
                            1.0,
                            0.0..=1.0e6,
                        );
                        changed |= param_row(ui, "Kernel size", &mut params.kernel_size, 1.0, 1..=50);
                        changed |= param_row(ui, "Min local", &mut params.min_local, 1.0, 0..=100);
                    }
                    ThresholdAlgorithm::RadialProfile => {
                        changed |= param_row(ui, "n IQR", &mut params.n_iqr, 1.0, 1..=50);
                        ui.label(form_label("Blur"));
                        changed |= ui.checkbox(&mut params.blur, "narrow").changed();
                        ui.end_row();
                    }
                }
            });

        if changed {
            self.ui_state.find_spots_changed();
        }

        self.render_tof_range(ui);
        ui.add_space(6.0);
    }

    /// ToF window applied to the experiment images, bounded by the plotted data.
    fn render_tof_range(&mut self, ui: &mut egui::Ui) {
        let Some((lo, hi)) = self.session.views().experiment.series().x_extent() else {
            return;
        };
        let can_send = self.can_send();
        let (mut min, mut max) = self.ui_state.tof_range.unwrap_or((lo, hi));
        let mut edited = false;
        let mut apply = false;

        ui.add_space(8.0);
        ui.label(form_label("ToF range (µs)"));
        ui.horizontal(|ui| {
            edited |= ui
                .add(egui::DragValue::new(&mut min).speed(1.0).range(lo..=max))
                .changed();
            ui.label("to");
            edited |= ui
                .add(egui::DragValue::new(&mut max).speed(1.0).range(min..=hi))
                .changed();
            apply = ui
                .add_enabled(can_send, egui::Button::new("Apply"))
                .clicked();
        });

        if apply {
            self.update_tof_range(min, max);
        } else if edited {
            self.ui_state.tof_range = Some((min, max));
        }
    }

    fn render_advanced_options(&mut self, ui: &mut egui::Ui, stage: Stage) {
        egui::CollapsingHeader::new("Advanced options")
            .id_salt(("advanced_options", stage.index()))
            .show(ui, |ui| {
                ui.label(stat_label("key=value pairs separated by spaces"));
                ui.add(
                    egui::TextEdit::multiline(&mut self.ui_state.advanced[stage.index()])
                        .desired_rows(2)
                        .desired_width(f32::INFINITY)
                        .font(egui::TextStyle::Monospace),
                );
            });
    }

    fn render_stage_log(&self, ui: &mut egui::Ui, stage: Stage) {
        let colors = ThemeColors::from_ui(ui);
        let record = self.session.stages().record(stage);
        let failed = !record.loading && !record.succeeded && !record.log.is_empty();
        let stroke = if failed {
            Stroke::new(1.0, accent::RED)
        } else {
            Stroke::new(1.0, colors.border)
        };

        ui.add_space(8.0);
        ui.label(form_label("Log"));
        egui::Frame::none()
            .fill(colors.bg_input)
            .stroke(stroke)
            .rounding(4.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt(("stage_log", stage.index()))
                    .stick_to_bottom(true)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        if record.log.is_empty() {
                            ui.label(stat_label("No output yet"));
                        } else {
                            let text = egui::RichText::new(markup_to_plain(&record.log)).monospace();
                            ui.label(if record.loading { text.weak() } else { text });
                        }
                    });
            });
    }
}

/// One labelled numeric control in a two-column grid.
fn param_row<N: egui::emath::Numeric>(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut N,
    speed: f64,
    range: RangeInclusive<N>,
) -> bool {
    ui.label(form_label(label));
    let changed = ui
        .add(egui::DragValue::new(value).speed(speed).range(range))
        .changed();
    ui.end_row();
    changed
}
