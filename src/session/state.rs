//! Session state machine.

use std::fmt;

/// Lifecycle state of a spawned process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// The process is being launched.
    #[default]
    Starting,
    /// The process is running and its output is being captured.
    Running,
    /// The process has exited and both output streams are drained.
    Exited,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Starting -> Running
    /// - Running -> Exited
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!((*self, target), (Starting, Running) | (Running, Exited))
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `true` if the transition happened. An invalid transition
    /// leaves the state unchanged.
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
        matches!(self, SessionState::Exited)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Exited => "exited",
        };
        f.write_str(name)
    }
}
