//! Channel client configuration.

use std::time::Duration;

/// Backend endpoint the console connects to by default.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:8888/";

/// Identifier sent in `record_connection`.
pub const DEFAULT_CLIENT_ID: &str = "gui";

/// Configuration for [`crate::ChannelClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    /// WebSocket URL of the backend.
    pub url: String,
    /// Identifier registered with the backend after every connect.
    pub client_id: String,
    /// Fixed wait between a dropped or failed connection and the next attempt.
    pub reconnect_delay: Duration,
    /// Upper bound on how long the worker blocks on a read before it checks
    /// for outgoing messages and shutdown.
    pub poll_interval: Duration,
    /// Bound on opening the TCP connection and completing the handshake.
    pub connect_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            reconnect_delay: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(50),
            connect_timeout: Duration::from_millis(5000),
        }
    }
}

impl ChannelConfig {
    /// Configuration for `url` with default timings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the reconnect delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
