//! Terminal session lifecycle.

use serde::Serialize;

/// Lifecycle state of a terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Shell spawned, waiting for the integration handshake.
    #[default]
    Starting,
    /// Shell ready and not running any tracked command.
    Idle,
    /// At least one tracked command is queued or running.
    Busy,
    /// Shell exited; the session cannot be reused.
    Closed,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Starting -> Idle | Busy | Closed
    /// - Idle -> Busy | Closed
    /// - Busy -> Idle | Closed
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Starting, Idle)
                | (Starting, Busy)
                | (Starting, Closed)
                | (Idle, Busy)
                | (Idle, Closed)
                | (Busy, Idle)
                | (Busy, Closed)
        )
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: SessionState) -> bool {
        if self.can_transition_to(target) {
            *self = target;
            true
        } else {
            false
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    /// Check if the session can accept commands.
    pub fn can_execute(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Starting => "starting",
            SessionState::Idle => "idle",
            SessionState::Busy => "busy",
            SessionState::Closed => "closed",
        }
    }
}
