//! UI rendering modules.
//!
//! Contains the UI rendering logic split into separate modules:
//! - `top_bar`: Branding, connection status and experiment summary
//! - `algorithm_tabs`: Left sidebar with one panel per pipeline stage
//! - `state_tabs`: Central panel with the view tabs
//! - `line_plot`: Experiment line plot with rubber-band zoom
//! - `reflection_table`: Reflection rows linked to the plot selection

mod algorithm_tabs;
mod line_plot;
mod reflection_table;
mod state_tabs;
pub(crate) mod theme;
mod top_bar;
