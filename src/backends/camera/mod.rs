// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! The controller never talks to hardware directly. It goes through three seams:
//!
//! ```text
//! ┌──────────────────────┐
//! │   CameraController   │  ← lifecycle, readiness, capture capability
//! └──────────┬───────────┘
//!            │
//!   ┌────────┴─────────┐
//!   ▼                  ▼
//! ┌─────────────┐  ┌────────────────┐
//! │DevicePlatform│  │ RenderingSink  │  ← provided by the host
//! └──────┬──────┘  └────────────────┘
//!        │ open(profile)
//!        ▼
//! ┌─────────────┐
//! │DeviceStream │  ← owned by the controller, stopped exactly once
//! └─────────────┘
//! ```
//!
//! [`v4l2`] provides the concrete GStreamer v4l2src implementation of all
//! three.

pub mod negotiator;
pub mod types;
pub mod v4l2;
pub mod v4l2_utils;

pub use negotiator::DeviceNegotiator;
pub use types::*;

use crate::media::raster::RasterBuffer;
use futures::future::BoxFuture;

/// An open handle to one or more hardware tracks
pub trait DeviceStream: Send + 'static {
    /// Number of hardware tracks backing this stream (video only, never audio)
    fn track_count(&self) -> usize;

    /// Characteristics the platform actually granted
    fn settings(&self) -> StreamSettings;

    /// Stop every track and release the hardware
    ///
    /// The owner calls this exactly once before discarding the stream.
    fn stop(&mut self);
}

/// Source of device streams
pub trait DevicePlatform: Send + Sync + 'static {
    type Stream: DeviceStream;

    /// Request a device satisfying `profile`
    ///
    /// This is the only suspending operation in the lifecycle. The returned
    /// future must not borrow the platform so it can outlive the call site.
    fn open(
        &self,
        profile: &CaptureRequestProfile,
    ) -> BoxFuture<'static, PlatformResult<Self::Stream>>;
}

/// Display target for a live stream, owned by the host
///
/// All methods take `&self`: the host keeps its own handle to the sink and
/// the controller only attaches and detaches streams.
pub trait RenderingSink<S: DeviceStream>: Send + Sync + 'static {
    /// Show `stream` on this sink, replacing whatever was attached
    fn attach(&self, stream: &S);

    /// Stop showing any stream
    fn detach(&self);

    /// Request playback start
    ///
    /// Failure here is not fatal; playback may still start later.
    fn play(&self) -> Result<(), SinkError>;

    /// Native dimensions of the frame currently shown, if any
    fn intrinsic_size(&self) -> Option<FrameSize>;

    /// Rasterize the currently visible frame into `target`
    ///
    /// `target` is sized from [`RenderingSink::intrinsic_size`].
    fn draw_frame(&self, target: &mut RasterBuffer) -> Result<(), SinkError>;
}
