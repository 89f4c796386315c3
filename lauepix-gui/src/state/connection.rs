//! Backend connection status as shown in the top bar.

use lauepix_io::ChannelEvent;

/// Last known state of the backend channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// First attempt has not finished yet.
    #[default]
    Connecting,
    Connected,
    /// Down; the reason is the last transport error. Reconnects continue.
    Disconnected(String),
}

impl ConnectionState {
    /// Follow a lifecycle event. Returns `true` if the state changed.
    pub fn apply(&mut self, event: &ChannelEvent) -> bool {
        let next = match event {
            ChannelEvent::Connected => ConnectionState::Connected,
            ChannelEvent::Disconnected(reason) | ChannelEvent::ConnectFailed(reason) => {
                ConnectionState::Disconnected(reason.clone())
            }
            ChannelEvent::Message(_) => return false,
        };
        let changed = *self != next;
        *self = next;
        changed
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected(_) => "Disconnected (retrying)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut state = ConnectionState::default();
        assert!(state.apply(&ChannelEvent::ConnectFailed("refused".into())));
        assert!(!state.apply(&ChannelEvent::ConnectFailed("refused".into())));
        assert!(state.apply(&ChannelEvent::Connected));
        assert!(state.is_connected());
        assert!(state.apply(&ChannelEvent::Disconnected("reset".into())));
        assert_eq!(state, ConnectionState::Disconnected("reset".into()));
    }
}
