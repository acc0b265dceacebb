use std::fmt;

/// Live connection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Handshake done, events flowing
    Open,
    /// Errored or closed by the remote end
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        }
    }

    /// Check if this state can transition to another state
    pub fn can_transition_to(&self, target: ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, target) {
            // Handshake succeeded or failed
            (Connecting, Open) => true,
            (Connecting, Closed) => true,

            // Error or remote close
            (Open, Closed) => true,

            // Only when the transport reports a new attempt
            (Closed, Connecting) => true,

            _ => false,
        }
    }

    /// Live/offline indicator
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded edge of the connection state machine
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub reason: String,
}

impl StateTransition {
    pub fn new(from: ConnectionState, to: ConnectionState, reason: impl Into<String>) -> Self {
        Self {
            from,
            to,
            reason: reason.into(),
        }
    }

    /// Transitions into `Open` require a full resync before events are applied
    pub fn requires_resync(&self) -> bool {
        self.to == ConnectionState::Open
    }
}
