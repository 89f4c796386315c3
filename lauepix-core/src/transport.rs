//! Outbound side of the backend channel, as seen by the session.

use std::cell::RefCell;

use crate::error::{Error, Result};
use crate::protocol::ChannelMessage;

/// Anything that can deliver a message to the backend.
///
/// Sending is fire-and-forget: implementations return
/// [`Error::NotConnected`] while the channel is down and never queue a
/// message for a later connection.
pub trait Transport {
    /// Send one message.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] if the channel is currently down.
    fn send(&self, message: &ChannelMessage) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, message: &ChannelMessage) -> Result<()> {
        (**self).send(message)
    }
}

/// In-memory transport that records what was sent.
///
/// Used by tests and by transcript replay, where there is no backend.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: RefCell<Vec<ChannelMessage>>,
    connected: bool,
}

impl RecordingTransport {
    /// A connected recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            connected: true,
        }
    }

    /// A recorder that behaves like a dropped connection.
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            connected: false,
        }
    }

    /// Messages sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<ChannelMessage> {
        self.sent.borrow().clone()
    }

    /// Command names sent so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|m| m.command.clone()).collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, message: &ChannelMessage) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.sent.borrow_mut().push(message.clone());
        Ok(())
    }
}
