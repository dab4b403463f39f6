//! Transfer run lifecycle

use std::fmt;

use serde::Serialize;

use crate::errors::{QueueError, QueueResult};

/// Lifecycle of one transfer run
///
/// Transitions are strictly sequential:
/// `Empty -> Populated -> Committed -> Running -> Done`.
/// Only a reset returns to `Empty`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum RunState {
    /// No tasks assigned
    #[default]
    Empty,
    /// Tasks distributed to slots
    Populated,
    /// Manifests written to the run directory
    Committed,
    /// Subprocesses launched
    Running,
    /// All subprocesses exited
    Done,
}

impl RunState {
    /// State that legally follows this one
    pub fn next(self) -> Option<RunState> {
        match self {
            RunState::Empty => Some(RunState::Populated),
            RunState::Populated => Some(RunState::Committed),
            RunState::Committed => Some(RunState::Running),
            RunState::Running => Some(RunState::Done),
            RunState::Done => None,
        }
    }

    /// Move to `to`, failing unless it is the immediate successor
    pub fn advance(&mut self, to: RunState) -> QueueResult<()> {
        if self.next() != Some(to) {
            return Err(QueueError::InvalidStateTransition {
                from: self.to_string(),
                to: to.to_string(),
            });
        }
        *self = to;
        Ok(())
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Empty => "EMPTY",
            RunState::Populated => "POPULATED",
            RunState::Committed => "COMMITTED",
            RunState::Running => "RUNNING",
            RunState::Done => "DONE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_transitions() {
        let mut state = RunState::default();
        for to in [
            RunState::Populated,
            RunState::Committed,
            RunState::Running,
            RunState::Done,
        ] {
            state.advance(to).unwrap();
        }
        assert_eq!(state, RunState::Done);
        assert!(state.advance(RunState::Populated).is_err());
    }

    #[test]
    fn test_skipping_is_rejected() {
        let mut state = RunState::Empty;
        let err = state.advance(RunState::Committed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid transfer run state transition from EMPTY to COMMITTED"
        );
        assert_eq!(state, RunState::Empty);

        let mut state = RunState::Populated;
        assert!(state.advance(RunState::Populated).is_err());
    }
}
