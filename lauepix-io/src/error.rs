//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection or framing error on the backend channel.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The path has no file name to report to the backend.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] lauepix_core::Error),
}
