//! Application message types for async communication.
//!
//! Messages are sent from background threads (the channel worker and the
//! import file reader) to the main UI thread, which applies them one at a
//! time at the start of each frame.

use lauepix_io::{ChannelEvent, EncodedFile};

/// Messages sent from background workers to the UI thread.
pub enum AppMessage {
    /// Connection lifecycle or an inbound backend message.
    Channel(ChannelEvent),

    /// A local file was read and encoded for upload.
    ImportFileReady(EncodedFile),

    /// A local file could not be read.
    ImportFileError(String),
}

impl From<ChannelEvent> for AppMessage {
    fn from(event: ChannelEvent) -> Self {
        AppMessage::Channel(event)
    }
}
