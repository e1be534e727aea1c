// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};

/// Pixel dimensions of a frame or surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A size is usable for capture only when both dimensions are non-zero
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Framerate as a fraction (numerator/denominator)
/// Stores exact framerate to handle NTSC rates like 59.94fps (60000/1001)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FramerateParts")]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

/// Unchecked serialized form of [`Framerate`]
#[derive(Deserialize)]
struct FramerateParts {
    num: u32,
    denom: u32,
}

impl TryFrom<FramerateParts> for Framerate {
    type Error = String;

    fn try_from(parts: FramerateParts) -> Result<Self, Self::Error> {
        if parts.denom == 0 {
            return Err(format!("framerate {}/0 has a zero denominator", parts.num));
        }
        Ok(Self {
            num: parts.num,
            denom: parts.denom,
        })
    }
}

impl Framerate {
    /// Create a new framerate from numerator and denominator
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    /// Create a framerate from an integer (e.g., 30 becomes 30/1)
    pub fn from_int(fps: u32) -> Self {
        Self { num: fps, denom: 1 }
    }

    /// Get the framerate as a floating point value
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    /// Get the rounded-down integer framerate
    pub fn as_int(&self) -> u32 {
        self.num / self.denom
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show decimal for non-integer framerates (NTSC)
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self { num: 30, denom: 1 }
    }
}

/// Which way the requested camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Facing the user (selfie camera)
    User,
    /// Facing away from the user (rear camera)
    #[default]
    Environment,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
        }
    }
}

/// What the controller asks the platform for when acquiring a device
///
/// The profile expresses an *ideal* target and a *minimum* floor. The platform is
/// expected to pick the best mode inside that range; nothing here downgrades it.
/// Audio is never part of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureRequestProfile {
    pub ideal: FrameSize,
    pub ideal_framerate: Framerate,
    pub min: FrameSize,
    pub min_framerate: Framerate,
    pub facing: FacingMode,
}

impl Default for CaptureRequestProfile {
    fn default() -> Self {
        use crate::constants::profile;

        Self {
            ideal: FrameSize::new(profile::IDEAL_WIDTH, profile::IDEAL_HEIGHT),
            ideal_framerate: Framerate::from_int(profile::IDEAL_FPS),
            min: FrameSize::new(profile::MIN_WIDTH, profile::MIN_HEIGHT),
            min_framerate: Framerate::from_int(profile::MIN_FPS),
            facing: FacingMode::default(),
        }
    }
}

impl CaptureRequestProfile {
    /// Whether a granted mode falls inside the requested floor
    pub fn accepts(&self, size: FrameSize, framerate: Option<Framerate>) -> bool {
        let size_ok = size.width >= self.min.width && size.height >= self.min.height;
        let rate_ok = framerate
            .map(|fps| fps.as_f64() >= self.min_framerate.as_f64())
            .unwrap_or(true);
        size_ok && rate_ok
    }

    /// Upper bound used when building range constraints (never below the floor)
    pub fn max_size(&self) -> FrameSize {
        FrameSize::new(
            self.ideal.width.max(self.min.width),
            self.ideal.height.max(self.min.height),
        )
    }
}

impl std::fmt::Display for CaptureRequestProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ideal {} @ {}fps, min {} @ {}fps, facing {}",
            self.ideal, self.ideal_framerate, self.min, self.min_framerate, self.facing
        )
    }
}

/// Characteristics the platform actually granted for a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    pub size: FrameSize,
    pub framerate: Option<Framerate>,
    /// Negotiated media type (e.g., "video/x-raw", "image/jpeg")
    pub media_type: String,
    /// Device node or identifier backing the stream
    pub device: String,
}

impl std::fmt::Display for StreamSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(fps) = &self.framerate {
            write!(f, "{} @ {}fps ({})", self.size, fps, self.media_type)
        } else {
            write!(f, "{} ({})", self.size, self.media_type)
        }
    }
}

/// Capture device discovered on the system
#[derive(Debug, Clone)]
pub struct CameraDevice {
    pub name: String,
    /// Device node (e.g., /dev/video0)
    pub path: String,
    pub driver: String,
    /// Largest discrete modes, best first
    pub resolutions: Vec<FrameSize>,
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Failures reported by a capture platform while opening a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The user or system declined access to the device
    PermissionDenied(String),
    /// Device is in use by another process
    Busy(String),
    /// No device matched the request
    NotFound(String),
    /// The device cannot satisfy the minimum profile
    ConstraintsUnsatisfiable(String),
    /// Any other backend fault
    Backend(String),
}

impl PlatformError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, PlatformError::PermissionDenied(_))
    }
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            PlatformError::Busy(msg) => write!(f, "Device busy: {}", msg),
            PlatformError::NotFound(msg) => write!(f, "Device not found: {}", msg),
            PlatformError::ConstraintsUnsatisfiable(msg) => {
                write!(f, "Constraints unsatisfiable: {}", msg)
            }
            PlatformError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for PlatformError {}

/// Failures reported by a rendering sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// No stream is attached
    NotAttached,
    /// The stream has not produced a frame yet
    NoFrame,
    /// The frame changed size between measuring and drawing
    SizeMismatch { expected: FrameSize, actual: FrameSize },
    /// Backend failure (e.g., autoplay refused, state change failed)
    Backend(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::NotAttached => write!(f, "No stream attached"),
            SinkError::NoFrame => write!(f, "No frame available"),
            SinkError::SizeMismatch { expected, actual } => {
                write!(f, "Frame size changed: expected {}, got {}", expected, actual)
            }
            SinkError::Backend(msg) => write!(f, "Sink error: {}", msg),
        }
    }
}

impl std::error::Error for SinkError {}
