// Service Lifecycle State

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the batch service: STARTING -> RUNNING -> STOPPING -> STOPPED
///
/// The sequence is linear; there is no way back to an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl ServiceState {
    fn successor(self) -> Option<ServiceState> {
        match self {
            ServiceState::Starting => Some(ServiceState::Running),
            ServiceState::Running => Some(ServiceState::Stopping),
            ServiceState::Stopping => Some(ServiceState::Stopped),
            ServiceState::Stopped => None,
        }
    }

    pub fn can_transition_to(self, next: ServiceState) -> bool {
        self.successor() == Some(next)
    }

    /// Validated transition
    pub fn transition(self, next: ServiceState) -> Result<ServiceState> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        Ok(next)
    }

    /// New cycles may only begin while RUNNING
    pub fn accepts_new_cycles(self) -> bool {
        self == ServiceState::Running
    }

    pub fn is_terminal(self) -> bool {
        self == ServiceState::Stopped
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Starting => write!(f, "STARTING"),
            ServiceState::Running => write!(f, "RUNNING"),
            ServiceState::Stopping => write!(f, "STOPPING"),
            ServiceState::Stopped => write!(f, "STOPPED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_lifecycle() {
        let state = ServiceState::Starting;
        let state = state.transition(ServiceState::Running).unwrap();
        assert!(state.accepts_new_cycles());
        let state = state.transition(ServiceState::Stopping).unwrap();
        assert!(!state.accepts_new_cycles());
        let state = state.transition(ServiceState::Stopped).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_no_backward_or_skipping_transitions() {
        let err = ServiceState::Stopping
            .transition(ServiceState::Running)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidStateTransition {
                from: "STOPPING".to_string(),
                to: "RUNNING".to_string(),
            }
        );

        assert!(!ServiceState::Starting.can_transition_to(ServiceState::Stopped));
        assert!(!ServiceState::Stopped.can_transition_to(ServiceState::Starting));
        assert!(!ServiceState::Running.can_transition_to(ServiceState::Running));
    }
}
