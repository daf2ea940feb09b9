//! Chat-network session state types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the single chat-network session.
///
/// Outbound sends are only permitted in [`SessionState::Connected`].
/// [`SessionState::LoggedOut`] is terminal: nothing transitions out of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Loading persisted credentials and requesting a transport connection.
    #[default]
    Initializing,

    /// No valid credentials; a pairing code is waiting to be scanned.
    AwaitingPairing,

    /// Authenticated session is open.
    Connected,

    /// The transport reported the channel closed.
    Disconnected,

    /// Waiting to re-attempt a connection.
    Reconnecting,

    /// Credentials were revoked by an explicit logout.
    LoggedOut,
}

impl SessionState {
    /// Whether outbound sends are permitted.
    pub fn is_ready(self) -> bool {
        self == Self::Connected
    }

    /// Whether this state is terminal.
    pub fn is_terminal(self) -> bool {
        self == Self::LoggedOut
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (LoggedOut, _) => false,
            (_, LoggedOut) => true,
            (Initializing, AwaitingPairing | Connected | Disconnected) => true,
            (AwaitingPairing, Connected | Disconnected) => true,
            (Connected, Disconnected) => true,
            (Disconnected, Reconnecting) => true,
            (Reconnecting, AwaitingPairing | Connected | Disconnected) => true,
            _ => false,
        }
    }

    /// Stable lowercase name used in logs and API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::AwaitingPairing => "awaiting_pairing",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Reconnecting => "reconnecting",
            Self::LoggedOut => "logged_out",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    const ALL: [SessionState; 6] = [
        Initializing,
        AwaitingPairing,
        Connected,
        Disconnected,
        Reconnecting,
        LoggedOut,
    ];

    #[test]
    fn test_only_connected_is_ready() {
        for state in ALL {
            assert_eq!(state.is_ready(), state == Connected, "{state}");
        }
    }

    #[test]
    fn test_logged_out_is_terminal() {
        for next in ALL {
            assert!(!LoggedOut.can_transition_to(next));
        }
    }

    #[test]
    fn test_every_live_state_can_log_out() {
        for state in ALL.into_iter().filter(|s| *s != LoggedOut) {
            assert!(state.can_transition_to(LoggedOut), "{state}");
        }
    }

    #[test]
    fn test_reconnect_path() {
        assert!(Connected.can_transition_to(Disconnected));
        assert!(Disconnected.can_transition_to(Reconnecting));
        assert!(Reconnecting.can_transition_to(Connected));
        assert!(Reconnecting.can_transition_to(AwaitingPairing));

        // Reconnecting is only entered from Disconnected.
        assert!(!Connected.can_transition_to(Reconnecting));
        assert!(!Initializing.can_transition_to(Reconnecting));
        // A closed channel cannot jump straight back to Connected.
        assert!(!Disconnected.can_transition_to(Connected));
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for state in ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
        }
    }
}
