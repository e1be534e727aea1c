// SPDX-License-Identifier: MPL-2.0

//! Camera capture - lifecycle controller and still capture for V4L2 cameras
//!
//! This library acquires a camera, binds its live stream to a rendering sink,
//! tracks when the feed is actually rendering and extracts JPEG stills from it.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`controller`]: activation lifecycle, readiness and the capture capability
//! - [`backends`]: device platform, stream and sink seams with a GStreamer implementation
//! - [`media`]: RGB raster the sink draws into
//! - [`pipelines`]: JPEG encoding and storage of stills
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let (sink, mut playback) = FrameSink::new();
//! let mut controller = CameraController::new(GstPlatform::default(), profile);
//! controller.set_sink(Some(Arc::new(sink)));
//! if let Some(acquisition) = controller.set_active(true) {
//!     let outcome = acquisition.run().await;
//!     controller.complete(outcome);
//! }
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod controller;
pub mod errors;
pub mod media;
pub mod pipelines;

// Re-export commonly used types
pub use backends::camera::v4l2::{FrameSink, GstPlatform, GstStream, PlaybackStarted};
pub use backends::camera::{
    CaptureRequestProfile, DevicePlatform, DeviceStream, FacingMode, FrameSize, Framerate,
    RenderingSink, StreamSettings,
};
pub use config::Config;
pub use controller::{
    Acquisition, AcquisitionOutcome, CameraController, CaptureHandle, ControllerStatus,
    LifecycleState,
};
pub use errors::{AcquisitionError, AcquisitionErrorKind, AppError, AppResult};
pub use pipelines::photo::{EncodedImage, PhotoEncoder};
