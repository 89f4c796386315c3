//! Error types for lauepix-core.

use thiserror::Error;

use crate::stage::Stage;
use crate::views::ViewKind;

/// Result type alias for lauepix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for console operations.
///
/// None of these are fatal: every variant describes an action that was
/// refused or a message that was dropped, and the session stays usable.
#[derive(Error, Debug)]
pub enum Error {
    /// The backend channel is down; the command was not sent.
    #[error("channel is not connected")]
    NotConnected,

    /// The stage has not been enabled by its predecessor yet.
    #[error("stage {0} is not enabled")]
    StageDisabled(Stage),

    /// The stage already has a run in flight.
    #[error("stage {0} is already running")]
    StageBusy(Stage),

    /// Cancel was requested for a stage with nothing in flight.
    #[error("stage {0} is not running")]
    StageNotRunning(Stage),

    /// The view tab is gated behind a stage that has not produced a result.
    #[error("view {0} is not available yet")]
    ViewDisabled(ViewKind),

    /// Inbound message could not be interpreted.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors raised while decoding inbound channel messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The frame is not a JSON object.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// The command is not one this console understands.
    #[error("unrecognised command: {0:?}")]
    UnknownCommand(String),

    /// The command is known but its payload is missing or mistyped fields.
    #[error("invalid payload for {command}: {source}")]
    InvalidPayload {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// Plot x and y arrays disagree in length.
    #[error("series length mismatch: {x} x values, {y} y values")]
    SeriesLength { x: usize, y: usize },
}
