//! Application theme and color definitions.
//!
//! Provides light and dark themes with monospace fonts, following system preference.

use std::sync::atomic::{AtomicBool, Ordering};

use eframe::egui::{
    self, Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Theme, Visuals,
};
use lauepix_core::StageStatus;

/// Shared accent colors (same for both themes).
pub mod accent {
    use eframe::egui::Color32;

    pub const BLUE: Color32 = Color32::from_rgb(0x4a, 0x9e, 0xff);
    pub const GREEN: Color32 = Color32::from_rgb(0x10, 0xb9, 0x81);
    pub const RED: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);
    pub const AMBER: Color32 = Color32::from_rgb(0xf5, 0x9e, 0x0b);
}

/// Theme-aware colors.
#[derive(Clone, Copy)]
pub struct ThemeColors {
    pub bg_dark: Color32,
    pub bg_panel: Color32,
    pub bg_header: Color32,
    pub bg_input: Color32,
    pub border: Color32,
    pub border_light: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub text_dim: Color32,
    pub button_hover: Color32,
}

const DARK: ThemeColors = ThemeColors {
    bg_dark: Color32::from_rgb(0x1a, 0x1a, 0x1a),
    bg_panel: Color32::from_rgb(0x1f, 0x1f, 0x1f),
    bg_header: Color32::from_rgb(0x25, 0x25, 0x25),
    bg_input: Color32::from_rgb(0x2a, 0x2a, 0x2a),
    border: Color32::from_rgb(0x33, 0x33, 0x33),
    border_light: Color32::from_rgb(0x44, 0x44, 0x44),
    text_primary: Color32::from_rgb(0xe0, 0xe0, 0xe0),
    text_muted: Color32::from_rgb(0x88, 0x88, 0x88),
    text_dim: Color32::from_rgb(0x66, 0x66, 0x66),
    button_hover: Color32::from_rgb(0x3a, 0x3a, 0x3a),
};

const LIGHT: ThemeColors = ThemeColors {
    bg_dark: Color32::from_rgb(0xf5, 0xf5, 0xf5),
    bg_panel: Color32::from_rgb(0xff, 0xff, 0xff),
    bg_header: Color32::from_rgb(0xfa, 0xfa, 0xfa),
    bg_input: Color32::from_rgb(0xf0, 0xf0, 0xf0),
    border: Color32::from_rgb(0xd0, 0xd0, 0xd0),
    border_light: Color32::from_rgb(0xc0, 0xc0, 0xc0),
    text_primary: Color32::from_rgb(0x1a, 0x1a, 0x1a),
    text_muted: Color32::from_rgb(0x66, 0x66, 0x66),
    text_dim: Color32::from_rgb(0x88, 0x88, 0x88),
    button_hover: Color32::from_rgb(0xdd, 0xdd, 0xdd),
};

impl ThemeColors {
    /// Get colors for the current theme from context.
    pub fn from_ctx(ctx: &egui::Context) -> Self {
        Self::from_dark_mode(ctx.style().visuals.dark_mode)
    }

    /// Get colors for the current theme from UI.
    pub fn from_ui(ui: &egui::Ui) -> Self {
        Self::from_dark_mode(ui.visuals().dark_mode)
    }

    pub fn from_dark_mode(is_dark: bool) -> Self {
        if is_dark {
            DARK
        } else {
            LIGHT
        }
    }

    /// Color of a stage tab for its status.
    pub fn stage(self, status: StageStatus) -> Color32 {
        match status {
            StageStatus::Disabled => self.text_dim,
            StageStatus::Idle => self.text_primary,
            StageStatus::Running => accent::BLUE,
        }
    }
}

/// Configure egui style for the given theme.
pub fn configure_style_for_theme(ctx: &egui::Context, theme: Theme) {
    let visuals = match theme {
        Theme::Dark => build_visuals(Visuals::dark(), DARK, 0.3),
        Theme::Light => build_visuals(Visuals::light(), LIGHT, 0.2),
    };

    ctx.set_visuals(visuals);
    configure_fonts_and_spacing(ctx);
}

/// Configure style based on current visuals (dark/light mode).
pub fn configure_style(ctx: &egui::Context) {
    let is_dark = ctx.style().visuals.dark_mode;
    let theme = if is_dark { Theme::Dark } else { Theme::Light };
    configure_style_for_theme(ctx, theme);
}

fn build_visuals(mut visuals: Visuals, colors: ThemeColors, selection_alpha: f32) -> Visuals {
    let rounding = Rounding::same(4.0);

    visuals.window_fill = colors.bg_panel;
    visuals.panel_fill = colors.bg_panel;
    visuals.faint_bg_color = colors.bg_dark;
    visuals.extreme_bg_color = colors.bg_input;

    let widgets = &mut visuals.widgets;
    widgets.noninteractive.bg_fill = colors.bg_input;
    widgets.noninteractive.fg_stroke = Stroke::new(1.0, colors.text_muted);
    widgets.noninteractive.bg_stroke = Stroke::new(1.0, colors.border);

    widgets.inactive.bg_fill = colors.bg_input;
    widgets.inactive.fg_stroke = Stroke::new(1.0, colors.text_primary);
    widgets.inactive.bg_stroke = Stroke::new(1.0, colors.border_light);

    widgets.hovered.bg_fill = colors.button_hover;
    widgets.hovered.fg_stroke = Stroke::new(1.0, colors.text_primary);
    widgets.hovered.bg_stroke = Stroke::new(1.0, accent::BLUE);

    widgets.active.bg_fill = accent::BLUE;
    widgets.active.fg_stroke = Stroke::new(1.0, Color32::WHITE);
    widgets.active.bg_stroke = Stroke::new(1.0, accent::BLUE);

    widgets.open.bg_fill = colors.bg_input;
    widgets.open.fg_stroke = Stroke::new(1.0, colors.text_primary);
    widgets.open.bg_stroke = Stroke::new(1.0, colors.border_light);

    for state in [
        &mut widgets.noninteractive,
        &mut widgets.inactive,
        &mut widgets.hovered,
        &mut widgets.active,
        &mut widgets.open,
    ] {
        state.rounding = rounding;
    }

    visuals.selection.bg_fill = accent::BLUE.gamma_multiply(selection_alpha);
    visuals.selection.stroke = Stroke::new(1.0, accent::BLUE);

    visuals
}

/// Configure fonts and spacing (theme-independent).
fn configure_fonts_and_spacing(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    style.text_styles = [
        (TextStyle::Small, FontId::new(10.0, FontFamily::Monospace)),
        (TextStyle::Body, FontId::new(12.0, FontFamily::Monospace)),
        (TextStyle::Button, FontId::new(12.0, FontFamily::Monospace)),
        (TextStyle::Heading, FontId::new(14.0, FontFamily::Monospace)),
        (
            TextStyle::Monospace,
            FontId::new(12.0, FontFamily::Monospace),
        ),
    ]
    .into();

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    style.spacing.indent = 16.0;

    ctx.set_style(style);
}

/// Style a button as the primary action button.
pub fn primary_button(text: &str) -> egui::Button<'_> {
    egui::Button::new(egui::RichText::new(text).color(Color32::WHITE))
        .fill(accent::GREEN)
        .rounding(Rounding::same(4.0))
}

/// Red stop button shown while a stage runs.
pub fn stop_button(text: &str) -> egui::Button<'_> {
    egui::Button::new(egui::RichText::new(text).color(Color32::WHITE))
        .fill(accent::RED)
        .rounding(Rounding::same(4.0))
}

/// Create a form label.
pub fn form_label(text: &str) -> egui::RichText {
    egui::RichText::new(text.to_uppercase()).size(10.0)
}

/// Create a stat label (left column).
pub fn stat_label(text: &str) -> egui::RichText {
    egui::RichText::new(text).size(11.0).weak()
}

/// Create a stat value (right column).
pub fn stat_value(text: &str) -> egui::RichText {
    egui::RichText::new(text).size(11.0)
}

/// Track the last applied theme to detect system theme changes.
static LAST_DARK_MODE: AtomicBool = AtomicBool::new(true);
static THEME_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Apply the current system theme, re-applying styles if the theme changed.
/// Call this in the update loop to follow system theme changes.
pub fn apply_system_theme(ctx: &egui::Context) {
    let is_dark = ctx.style().visuals.dark_mode;
    let was_initialized = THEME_INITIALIZED.swap(true, Ordering::Relaxed);
    let last_dark = LAST_DARK_MODE.swap(is_dark, Ordering::Relaxed);

    if !was_initialized || last_dark != is_dark {
        let theme = if is_dark { Theme::Dark } else { Theme::Light };
        configure_style_for_theme(ctx, theme);
    }
}
