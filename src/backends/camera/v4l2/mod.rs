// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer v4l2src capture platform
//!
//! [`GstPlatform`] opens a V4L2 node through a GStreamer pipeline and hands
//! back a [`GstStream`]; [`FrameSink`] renders that stream into memory so the
//! controller can rasterize stills from it.

mod pipeline;
mod sink;

pub use sink::{FrameSink, PlaybackStarted};

use super::types::{CaptureRequestProfile, PlatformError, PlatformResult, StreamSettings};
use super::{DevicePlatform, DeviceStream, v4l2_utils};
use futures::FutureExt;
use futures::future::BoxFuture;
use gstreamer_app::AppSink;
use pipeline::CapturePipeline;
use tracing::{debug, info};

/// Opens V4L2 devices through GStreamer
#[derive(Debug, Clone, Default)]
pub struct GstPlatform {
    /// Explicit device node; the first capture device is used when unset
    device_path: Option<String>,
}

impl GstPlatform {
    pub fn new(device_path: Option<String>) -> Self {
        Self { device_path }
    }

    pub fn device_path(&self) -> Option<&str> {
        self.device_path.as_deref()
    }
}

impl DevicePlatform for GstPlatform {
    type Stream = GstStream;

    fn open(&self, profile: &CaptureRequestProfile) -> BoxFuture<'static, PlatformResult<GstStream>> {
        let device_path = self.device_path.clone();
        let profile = profile.clone();

        // Owned inside the blocking task so an abandoned open still stops the pipeline
        async move {
            tokio::task::spawn_blocking(move || {
                let device_path = device_path.unwrap_or_else(v4l2_utils::default_device_path);
                debug!(device = %device_path, "Opening capture device");
                pipeline::build(&device_path, &profile).map(GstStream::new)
            })
            .await
            .map_err(|e| PlatformError::Backend(format!("Device open task failed: {}", e)))?
        }
        .boxed()
    }
}

/// A live V4L2 capture pipeline
///
/// Holds exactly one video track. The pipeline keeps the device open until
/// [`DeviceStream::stop`] runs or the stream is dropped.
pub struct GstStream {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    settings: StreamSettings,
    stopped: bool,
}

impl GstStream {
    fn new(opened: CapturePipeline) -> Self {
        Self {
            pipeline: opened.pipeline,
            appsink: opened.appsink,
            settings: opened.settings,
            stopped: false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl DeviceStream for GstStream {
    fn track_count(&self) -> usize {
        if self.stopped { 0 } else { 1 }
    }

    fn settings(&self) -> StreamSettings {
        self.settings.clone()
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!(device = %self.settings.device, "Stopping capture pipeline");
        pipeline::shutdown(&self.pipeline, &self.appsink);
    }
}

impl Drop for GstStream {
    fn drop(&mut self) {
        if !self.stopped {
            debug!("Dropping live capture pipeline - stopping");
            self.stop();
        }
    }
}

impl std::fmt::Debug for GstStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GstStream")
            .field("settings", &self.settings)
            .field("stopped", &self.stopped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gstreamer::prelude::*;
    use std::time::Duration;

    /// Playing pipeline around a lone appsink, or `None` without GStreamer
    fn live_pipeline() -> Option<CapturePipeline> {
        gstreamer::init().ok()?;
        let appsink = gstreamer::ElementFactory::make("appsink")
            .build()
            .ok()?
            .downcast::<AppSink>()
            .ok()?;
        let pipeline = gstreamer::Pipeline::new();
        pipeline.add(&appsink).ok()?;
        pipeline.set_state(gstreamer::State::Playing).ok()?;
        Some(CapturePipeline {
            pipeline,
            appsink,
            settings: StreamSettings {
                size: crate::backends::camera::FrameSize::new(640, 480),
                framerate: None,
                media_type: "video/x-raw".to_string(),
                device: "/dev/video-test".to_string(),
            },
        })
    }

    #[test]
    fn test_stop_is_idempotent() {
        let Some(opened) = live_pipeline() else {
            return;
        };
        let pipeline = opened.pipeline.clone();
        let mut stream = GstStream::new(opened);
        assert_eq!(stream.track_count(), 1);

        stream.stop();
        stream.stop();
        assert!(stream.is_stopped());
        assert_eq!(stream.track_count(), 0);
        assert_eq!(pipeline.current_state(), gstreamer::State::Null);
    }

    #[tokio::test]
    async fn test_abandoned_open_stops_pipeline() {
        let Some(opened) = live_pipeline() else {
            return;
        };
        let pipeline = opened.pipeline.clone();

        // Nobody awaits the task, as when the open future is dropped mid-flight
        let task = tokio::task::spawn_blocking(move || {
            std::thread::sleep(Duration::from_millis(20));
            GstStream::new(opened)
        });
        drop(task);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while pipeline.current_state() != gstreamer::State::Null
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(pipeline.current_state(), gstreamer::State::Null);
    }
}
