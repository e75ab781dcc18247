//! Recorder lifecycle state machine

use std::fmt;
use thiserror::Error;

/// Public recorder states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecorderState {
    #[default]
    Inactive,
    Recording,
    Paused,
}

impl RecorderState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an operation is invoked in a state that does not allow it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid state: cannot {action} while {current_state}")]
pub struct InvalidStateTransition {
    pub current_state: RecorderState,
    pub action: &'static str,
}

/// Recorder lifecycle.
///
/// State machine:
///   INACTIVE -> RECORDING (start)
///   RECORDING -> PAUSED (pause)
///   PAUSED -> RECORDING (resume)
///   RECORDING | PAUSED -> INACTIVE (stop)
///
/// A rejected transition leaves the state untouched.
#[derive(Debug, Default)]
pub struct RecorderLifecycle {
    state: RecorderState,
}

impl RecorderLifecycle {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Inactive,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_inactive(&self) -> bool {
        self.state == RecorderState::Inactive
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn is_paused(&self) -> bool {
        self.state == RecorderState::Paused
    }

    /// Fail unless the recorder is in `expected`
    pub fn ensure(
        &self,
        expected: RecorderState,
        action: &'static str,
    ) -> Result<(), InvalidStateTransition> {
        if self.state != expected {
            return Err(self.reject(action));
        }
        Ok(())
    }

    /// Fail when the recorder is inactive
    pub fn ensure_active(&self, action: &'static str) -> Result<(), InvalidStateTransition> {
        if self.is_inactive() {
            return Err(self.reject(action));
        }
        Ok(())
    }

    /// Transition from INACTIVE to RECORDING
    pub fn start(&mut self) -> Result<(), InvalidStateTransition> {
        self.ensure(RecorderState::Inactive, "start")?;
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Transition from RECORDING to PAUSED
    pub fn pause(&mut self) -> Result<(), InvalidStateTransition> {
        self.ensure(RecorderState::Recording, "pause")?;
        self.state = RecorderState::Paused;
        Ok(())
    }

    /// Transition from PAUSED to RECORDING
    pub fn resume(&mut self) -> Result<(), InvalidStateTransition> {
        self.ensure(RecorderState::Paused, "resume")?;
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Transition from RECORDING or PAUSED to INACTIVE
    pub fn stop(&mut self) -> Result<(), InvalidStateTransition> {
        self.ensure_active("stop")?;
        self.state = RecorderState::Inactive;
        Ok(())
    }

    fn reject(&self, action: &'static str) -> InvalidStateTransition {
        InvalidStateTransition {
            current_state: self.state,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lifecycle_is_inactive() {
        let lifecycle = RecorderLifecycle::new();
        assert!(lifecycle.is_inactive());
        assert!(!lifecycle.is_recording());
        assert!(!lifecycle.is_paused());
    }

    #[test]
    fn start_from_inactive() {
        let mut lifecycle = RecorderLifecycle::new();
        assert!(lifecycle.start().is_ok());
        assert!(lifecycle.is_recording());
    }

    #[test]
    fn start_twice_fails() {
        let mut lifecycle = RecorderLifecycle::new();
        lifecycle.start().unwrap();

        let err = lifecycle.start().unwrap_err();
        assert_eq!(err.current_state, RecorderState::Recording);
        assert_eq!(err.action, "start");
        assert!(lifecycle.is_recording());
    }

    #[test]
    fn pause_requires_recording() {
        let mut lifecycle = RecorderLifecycle::new();
        let err = lifecycle.pause().unwrap_err();
        assert_eq!(err.current_state, RecorderState::Inactive);

        lifecycle.start().unwrap();
        lifecycle.pause().unwrap();
        let err = lifecycle.pause().unwrap_err();
        assert_eq!(err.current_state, RecorderState::Paused);
    }

    #[test]
    fn resume_requires_paused() {
        let mut lifecycle = RecorderLifecycle::new();
        assert!(lifecycle.resume().is_err());

        lifecycle.start().unwrap();
        let err = lifecycle.resume().unwrap_err();
        assert_eq!(err.current_state, RecorderState::Recording);
    }

    #[test]
    fn stop_from_recording_and_paused() {
        let mut lifecycle = RecorderLifecycle::new();
        lifecycle.start().unwrap();
        assert!(lifecycle.stop().is_ok());
        assert!(lifecycle.is_inactive());

        lifecycle.start().unwrap();
        lifecycle.pause().unwrap();
        assert!(lifecycle.stop().is_ok());
        assert!(lifecycle.is_inactive());
    }

    #[test]
    fn stop_from_inactive_fails() {
        let mut lifecycle = RecorderLifecycle::new();
        let err = lifecycle.stop().unwrap_err();
        assert_eq!(err.current_state, RecorderState::Inactive);
        assert!(lifecycle.ensure_active("request data").is_err());
    }

    #[test]
    fn full_cycle() {
        let mut lifecycle = RecorderLifecycle::new();
        lifecycle.start().unwrap();
        lifecycle.pause().unwrap();
        assert!(lifecycle.is_paused());
        lifecycle.resume().unwrap();
        assert!(lifecycle.is_recording());
        lifecycle.stop().unwrap();

        // Can start another cycle
        lifecycle.start().unwrap();
        assert!(lifecycle.is_recording());
    }

    #[test]
    fn state_display() {
        assert_eq!(RecorderState::Inactive.to_string(), "inactive");
        assert_eq!(RecorderState::Recording.to_string(), "recording");
        assert_eq!(RecorderState::Paused.to_string(), "paused");
    }

    #[test]
    fn error_display() {
        let err = InvalidStateTransition {
            current_state: RecorderState::Inactive,
            action: "pause",
        };
        let msg = err.to_string();
        assert!(msg.contains("pause"));
        assert!(msg.contains("inactive"));
    }
}
