//! Session state machine
//!
//! States advance forward only; `Stopped` is reachable from every
//! non-terminal state (teardown is always legal) and `Failed` from the two
//! setup states on platform error. Sessions are one-shot: there is no path
//! back to `Idle`.

use crate::error::{CaptureError, CaptureResult};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Constructed, nothing acquired
    Idle,
    /// Waiting for the platform to open the device
    Acquiring,
    /// Waiting for capture session configuration
    Negotiating,
    /// Repeating preview request active, frames flowing
    Previewing,
    /// Encoder running on top of the preview
    Recording,
    /// All native handles released
    Stopped,
    /// Setup failed; resources released best-effort
    Failed,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

impl SessionState {
    /// Terminal states accept no further events except the idempotent stop
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped)
    }
}

/// Events that drive the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    DeviceOpened,
    /// Device error or disconnect during acquisition
    DeviceLost,
    SessionConfigured,
    ConfigurationFailed,
    StartRecord,
    Stop,
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionEvent::Start => "start",
            SessionEvent::DeviceOpened => "device-opened",
            SessionEvent::DeviceLost => "device-lost",
            SessionEvent::SessionConfigured => "session-configured",
            SessionEvent::ConfigurationFailed => "configuration-failed",
            SessionEvent::StartRecord => "startRecord",
            SessionEvent::Stop => "stop",
        };
        write!(f, "{name}")
    }
}

impl SessionState {
    /// Resolve the transition for `event`, or `InvalidState` with no side
    /// effect for an illegal edge.
    pub(crate) fn next(self, event: SessionEvent) -> CaptureResult<SessionState> {
        use SessionEvent::*;
        use SessionState::*;

        match (self, event) {
            (Idle, Start) => Ok(Acquiring),
            (Acquiring, DeviceOpened) => Ok(Negotiating),
            (Acquiring, DeviceLost) => Ok(Failed),
            (Negotiating, SessionConfigured) => Ok(Previewing),
            (Negotiating, ConfigurationFailed) => Ok(Failed),
            (Previewing, StartRecord) => Ok(Recording),
            // Teardown is legal from every non-terminal state, Failed included
            (state, Stop) if !state.is_terminal() => Ok(Stopped),
            (state, event) => Err(CaptureError::InvalidState(format!(
                "'{event}' is not legal in state {state:?}"
            ))),
        }
    }
}
