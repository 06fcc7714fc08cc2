//! Session lifecycle state resource.
//!
//! Exactly one [`SessionState`] lives in each session's world. Transitions go
//! through [`SessionState::transition`], which rejects edges the lifecycle
//! does not have:
//!
//! ```text
//! Idle -> Initializing -> Active <-> Paused
//!              |             \        /
//!              v              Stopped
//!             Idle   (surface creation failed)
//! ```

use bevy_ecs::prelude::Resource;
use log::info;
use serde::Serialize;

use crate::errors::EngineError;

/// Discrete lifecycle states of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SessionStates {
    #[default]
    Idle,
    Initializing,
    Active,
    Paused,
    Stopped,
}

impl SessionStates {
    pub fn can_transition_to(self, next: SessionStates) -> bool {
        use SessionStates::*;
        matches!(
            (self, next),
            (Idle, Initializing)
                | (Initializing, Active)
                | (Initializing, Idle)
                | (Active, Paused)
                | (Paused, Active)
                | (Active, Stopped)
                | (Paused, Stopped)
        )
    }

    /// Entities only exist while the session is running.
    pub fn is_running(self) -> bool {
        matches!(self, SessionStates::Active | SessionStates::Paused)
    }
}

/// Authoritative current session state.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    current: SessionStates,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only access to the current state.
    pub fn get(&self) -> SessionStates {
        self.current
    }

    /// Move to `next`, returning the previous state.
    pub fn transition(&mut self, next: SessionStates) -> Result<SessionStates, EngineError> {
        let from = self.current;
        if !from.can_transition_to(next) {
            return Err(EngineError::InvalidTransition { from, to: next });
        }
        info!("Transitioning from {:?} to {:?}", from, next);
        self.current = next;
        Ok(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut s = SessionState::new();
        assert_eq!(s.get(), SessionStates::Idle);
        s.transition(SessionStates::Initializing).unwrap();
        s.transition(SessionStates::Active).unwrap();
        s.transition(SessionStates::Paused).unwrap();
        s.transition(SessionStates::Active).unwrap();
        assert_eq!(
            s.transition(SessionStates::Stopped).unwrap(),
            SessionStates::Active
        );
    }

    #[test]
    fn test_stopped_is_terminal() {
        use SessionStates::*;
        for next in [Idle, Initializing, Active, Paused, Stopped] {
            assert!(!Stopped.can_transition_to(next));
        }
    }

    #[test]
    fn test_invalid_edge_is_reported() {
        let mut s = SessionState::new();
        let err = s.transition(SessionStates::Paused).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: SessionStates::Idle,
                to: SessionStates::Paused
            }
        ));
        assert_eq!(s.get(), SessionStates::Idle);
    }

    #[test]
    fn test_is_running() {
        assert!(SessionStates::Active.is_running());
        assert!(SessionStates::Paused.is_running());
        assert!(!SessionStates::Initializing.is_running());
        assert!(!SessionStates::Stopped.is_running());
    }
}
