//! Top bar: branding, backend connection and experiment summary.

use eframe::egui;

use super::theme::{accent, stat_label, stat_value, ThemeColors};
use crate::app::LauepixApp;
use crate::state::ConnectionState;

impl LauepixApp {
    /// Render the top panel with LAUEPIX branding, connection status and
    /// the instrument currently loaded by the backend.
    pub(crate) fn render_top_panel(&mut self, ctx: &egui::Context) {
        let colors = ThemeColors::from_ctx(ctx);

        egui::TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_header)
                    .inner_margin(egui::Margin {
                        left: 16.0,
                        right: 16.0,
                        top: 8.0,
                        bottom: 8.0,
                    }),
            )
            .show(ctx, |ui| {
                ui.set_min_height(36.0);
                ui.with_layout(egui::Layout::left_to_right(egui::Align::Center), |ui| {
                    ui.spacing_mut().item_spacing = egui::vec2(10.0, 0.0);

                    ui.label(
                        egui::RichText::new("LAUEPIX")
                            .size(14.0)
                            .strong()
                            .color(accent::BLUE),
                    );
                    Self::top_bar_separator(ui, colors);
                    self.render_connection_status(ui, colors);
                    Self::top_bar_separator(ui, colors);
                    self.render_experiment_summary(ui);

                    if let Some(notice) = &self.ui_state.notice {
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.label(egui::RichText::new(notice).size(11.0).color(accent::AMBER));
                        });
                    }
                });
            });
    }

    fn render_connection_status(&self, ui: &mut egui::Ui, colors: ThemeColors) {
        let color = match self.connection {
            ConnectionState::Connected => accent::GREEN,
            ConnectionState::Connecting => accent::AMBER,
            ConnectionState::Disconnected(_) => accent::RED,
        };

        let (rect, _) = ui.allocate_exact_size(egui::vec2(8.0, 8.0), egui::Sense::hover());
        ui.painter().circle_filled(rect.center(), 4.0, color);

        let response = ui.label(stat_value(self.connection.label()).color(colors.text_primary));
        if let ConnectionState::Disconnected(reason) = &self.connection {
            response.on_hover_text(reason);
        }
        ui.label(stat_label(&self.server_url));
    }

    fn render_experiment_summary(&self, ui: &mut egui::Ui) {
        let summary = self.session.summary();
        if summary.instrument_name.is_empty() {
            ui.label(stat_label("No experiment loaded"));
            return;
        }

        ui.label(stat_value(&summary.instrument_name).strong());
        if !summary.experiment_description.is_empty() {
            ui.label(stat_label(&summary.experiment_description));
        }
        for text in [
            &summary.reflections_summary,
            &summary.crystal_summary,
            &summary.integration_summary,
        ] {
            if !text.is_empty() {
                ui.label(stat_value(text));
            }
        }
    }

    fn top_bar_separator(ui: &mut egui::Ui, colors: ThemeColors) {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(1.0, 20.0), egui::Sense::hover());
        ui.painter().rect_filled(rect, 0.0, colors.border);
    }
}
