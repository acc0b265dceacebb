//! Connection lifecycle tracking
//!
//! Records the state the transport reports. The transport is the source of
//! truth about the socket, so an unexpected edge is logged and then accepted
//! rather than refused.

use tracing::{info, warn};

use crate::domain::{ConnectionState, StateTransition};
use crate::error::{QuickPollError, Result};

#[derive(Debug, Clone)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    opened_count: u64,
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionLifecycle {
    /// Starts offline until the transport reports an attempt
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Closed,
            opened_count: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// How many times the connection has entered `Open`
    pub fn opened_count(&self) -> u64 {
        self.opened_count
    }

    /// Move along a valid edge of the state machine
    pub fn transition(&mut self, to: ConnectionState, reason: &str) -> Result<StateTransition> {
        if !self.state.can_transition_to(to) {
            return Err(QuickPollError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        Ok(self.record(to, reason))
    }

    /// Accept whatever the transport reports.
    ///
    /// Returns `None` when the state did not change.
    pub fn observe(&mut self, to: ConnectionState, reason: &str) -> Option<StateTransition> {
        if self.state == to {
            return None;
        }
        match self.transition(to, reason) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("{}; accepting transport state", e);
                Some(self.record(to, reason))
            }
        }
    }

    fn record(&mut self, to: ConnectionState, reason: &str) -> StateTransition {
        let transition = StateTransition::new(self.state, to, reason);
        info!(
            from = %transition.from,
            to = %transition.to,
            "connection {}: {}",
            to,
            reason
        );
        self.state = to;
        if to == ConnectionState::Open {
            self.opened_count += 1;
        }
        transition
    }
}
