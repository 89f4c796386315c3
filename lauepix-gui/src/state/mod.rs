//! Application state modules.

mod connection;
mod ui;

pub use connection::ConnectionState;
pub use ui::{ThresholdAlgorithm, UiState};
