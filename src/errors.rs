// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera capture crate

use crate::backends::camera::types::{PlatformError, SinkError};
use crate::constants::messages;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera-related errors
    Camera(CameraError),
    /// Still capture errors
    Capture(CaptureError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Camera-specific errors
#[derive(Debug, Clone)]
pub enum CameraError {
    /// Acquisition failed (permission or hardware)
    Acquisition(AcquisitionError),
    /// Camera did not start rendering in time
    PlaybackTimeout,
    /// Backend error (e.g., GStreamer)
    BackendError(String),
}

/// Still capture errors
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// No frame available for capture
    NotReady,
    /// Encoding failed
    EncodingFailed(String),
    /// Save failed
    SaveFailed(String),
}

/// Classification of a failed acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionErrorKind {
    /// The user or system declined access to the camera
    Permission,
    /// The device is busy, missing, or cannot satisfy the request
    HardwareUnavailable,
}

impl fmt::Display for AcquisitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionErrorKind::Permission => write!(f, "permission"),
            AcquisitionErrorKind::HardwareUnavailable => write!(f, "hardware-unavailable"),
        }
    }
}

/// Structured record of a failed acquisition attempt, shown to the user as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionError {
    pub kind: AcquisitionErrorKind,
    pub title: String,
    pub message: String,
}

impl AcquisitionError {
    pub fn permission() -> Self {
        Self {
            kind: AcquisitionErrorKind::Permission,
            title: messages::PERMISSION_TITLE.to_string(),
            message: messages::PERMISSION_MESSAGE.to_string(),
        }
    }

    pub fn hardware_unavailable() -> Self {
        Self {
            kind: AcquisitionErrorKind::HardwareUnavailable,
            title: messages::HARDWARE_TITLE.to_string(),
            message: messages::HARDWARE_MESSAGE.to_string(),
        }
    }

    /// Map a platform failure onto the two user-facing kinds
    ///
    /// Only an explicit permission refusal is `Permission`; everything else
    /// (busy, missing, unsatisfiable, backend fault) is `HardwareUnavailable`.
    pub fn classify(err: &PlatformError) -> Self {
        if err.is_permission_denied() {
            Self::permission()
        } else {
            Self::hardware_unavailable()
        }
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::Acquisition(e) => write!(f, "{}", e),
            CameraError::PlaybackTimeout => write!(f, "Camera did not start streaming in time"),
            CameraError::BackendError(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NotReady => write!(f, "Camera is not ready for capture"),
            CaptureError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            CaptureError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for AcquisitionError {}

// Conversions from sub-errors to AppError
impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<AcquisitionError> for AppError {
    fn from(err: AcquisitionError) -> Self {
        AppError::Camera(CameraError::Acquisition(err))
    }
}

impl From<PlatformError> for AppError {
    fn from(err: PlatformError) -> Self {
        AppError::Camera(CameraError::BackendError(err.to_string()))
    }
}

impl From<SinkError> for AppError {
    fn from(err: SinkError) -> Self {
        AppError::Camera(CameraError::BackendError(err.to_string()))
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

// Conversions for I/O errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::SaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_classification() {
        let err = AcquisitionError::classify(&PlatformError::PermissionDenied(
            "/dev/video0".to_string(),
        ));
        assert_eq!(err.kind, AcquisitionErrorKind::Permission);
        assert_eq!(err.title, messages::PERMISSION_TITLE);
    }

    #[test]
    fn test_everything_else_is_hardware() {
        let failures = [
            PlatformError::Busy("in use".to_string()),
            PlatformError::NotFound("gone".to_string()),
            PlatformError::ConstraintsUnsatisfiable("640x480 only".to_string()),
            PlatformError::Backend("pipeline".to_string()),
        ];
        for failure in &failures {
            assert_eq!(
                AcquisitionError::classify(failure).kind,
                AcquisitionErrorKind::HardwareUnavailable,
                "{:?} should be a hardware failure",
                failure
            );
        }
    }

    #[test]
    fn test_app_error_from_acquisition() {
        let err: AppError = AcquisitionError::permission().into();
        assert!(err.to_string().contains(messages::PERMISSION_TITLE));
    }
}
