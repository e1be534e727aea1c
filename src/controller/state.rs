// SPDX-License-Identifier: GPL-3.0-only

//! Lifecycle state and the status snapshot published to the host

use super::capture::CaptureHandle;
use crate::errors::AcquisitionError;

/// Where the controller is in the acquire → play → release cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    /// No device held, nothing pending
    #[default]
    Idle,
    /// Waiting for the platform to grant a device
    Initializing,
    /// Device held and bound to the sink, but no frame rendered yet
    StreamAcquired,
    /// The sink is rendering live frames; capture is available
    Ready,
    /// The last acquisition failed; see the controller's error
    Error,
}

impl LifecycleState {
    pub fn is_initializing(&self) -> bool {
        matches!(self, LifecycleState::Initializing)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LifecycleState::Ready)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LifecycleState::Error)
    }

    /// Whether a device stream is open in this state
    pub fn has_stream(&self) -> bool {
        matches!(self, LifecycleState::StreamAcquired | LifecycleState::Ready)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Idle => write!(f, "idle"),
            LifecycleState::Initializing => write!(f, "initializing"),
            LifecycleState::StreamAcquired => write!(f, "stream-acquired"),
            LifecycleState::Ready => write!(f, "ready"),
            LifecycleState::Error => write!(f, "error"),
        }
    }
}

/// Everything a presentation layer needs to render the camera view
///
/// Published on every change through [`super::CameraController::subscribe`].
#[derive(Debug, Clone, Default)]
pub struct ControllerStatus {
    pub active: bool,
    pub state: LifecycleState,
    pub error: Option<AcquisitionError>,
    /// Advisory flag from the host, passed through untouched
    pub processing: bool,
    /// Last result count reported by the frame consumer, passed through untouched
    pub last_count: Option<u32>,
    /// Capture capability for the current stream, if one is open
    pub capture: Option<CaptureHandle>,
}

impl ControllerStatus {
    pub fn initializing(&self) -> bool {
        self.state.is_initializing()
    }

    pub fn ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}
