// SPDX-License-Identifier: GPL-3.0-only

//! In-memory rendering sink for [`GstStream`]
//!
//! Keeps the latest RGB sample pulled from the stream's appsink. The first
//! sample after each attach is reported on the playback channel, which the
//! host forwards to the controller as the "playback started" signal.

use super::super::types::{FrameSize, SinkError};
use super::super::{DeviceStream, RenderingSink};
use super::GstStream;
use crate::constants::timing;
use crate::media::raster::RasterBuffer;
use futures::channel::mpsc;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// First frame of an attachment reached the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackStarted {
    /// Attachment generation the frame belongs to
    pub attachment: u64,
    pub size: FrameSize,
}

struct Attachment {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
}

struct Frames {
    latest: Mutex<Option<gstreamer::Sample>>,
    generation: AtomicU64,
    events: mpsc::UnboundedSender<PlaybackStarted>,
}

impl Frames {
    fn latest(&self) -> MutexGuard<'_, Option<gstreamer::Sample>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sink that keeps the most recent decoded frame of the attached stream
pub struct FrameSink {
    frames: Arc<Frames>,
    attachment: Mutex<Option<Attachment>>,
}

impl FrameSink {
    /// Create a sink and the receiver for its playback events
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PlaybackStarted>) {
        let (events, receiver) = mpsc::unbounded();
        let sink = Self {
            frames: Arc::new(Frames {
                latest: Mutex::new(None),
                generation: AtomicU64::new(0),
                events,
            }),
            attachment: Mutex::new(None),
        };
        (sink, receiver)
    }

    /// Generation of the current attachment; playback events from older
    /// attachments carry a smaller number
    pub fn attachment(&self) -> u64 {
        self.frames.generation.load(Ordering::Acquire)
    }

    pub fn is_attached(&self) -> bool {
        self.lock_attachment().is_some()
    }

    fn lock_attachment(&self) -> MutexGuard<'_, Option<Attachment>> {
        self.attachment.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn latest_frame(&self) -> Option<(gstreamer::Sample, VideoInfo)> {
        let sample = self.frames.latest().clone()?;
        let info = VideoInfo::from_caps(sample.caps()?).ok()?;
        Some((sample, info))
    }
}

fn install_callbacks(appsink: &AppSink, frames: Arc<Frames>, generation: u64) {
    let first = AtomicBool::new(true);
    let counter = AtomicU64::new(0);

    appsink.set_callbacks(
        gstreamer_app::AppSinkCallbacks::builder()
            .new_sample(move |appsink| {
                let sample = appsink
                    .pull_sample()
                    .map_err(|_| gstreamer::FlowError::Eos)?;

                if frames.generation.load(Ordering::Acquire) != generation {
                    return Ok(gstreamer::FlowSuccess::Ok);
                }

                let size = sample
                    .caps()
                    .and_then(|caps| VideoInfo::from_caps(caps).ok())
                    .map(|info| FrameSize::new(info.width(), info.height()));
                *frames.latest() = Some(sample);

                let frame_num = counter.fetch_add(1, Ordering::Relaxed);
                if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                    debug!(frame = frame_num, size = ?size, "Sink frame");
                }

                if let Some(size) = size
                    && first.swap(false, Ordering::AcqRel)
                {
                    info!(attachment = generation, size = %size, "First frame rendered");
                    let _ = frames.events.unbounded_send(PlaybackStarted {
                        attachment: generation,
                        size,
                    });
                }

                Ok(gstreamer::FlowSuccess::Ok)
            })
            .build(),
    );
}

impl RenderingSink<GstStream> for FrameSink {
    fn attach(&self, stream: &GstStream) {
        let mut attachment = self.lock_attachment();
        if let Some(previous) = attachment.take() {
            previous
                .appsink
                .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        }

        let generation = self.frames.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *self.frames.latest() = None;

        debug!(attachment = generation, settings = %stream.settings(), "Attaching stream");
        install_callbacks(&stream.appsink, Arc::clone(&self.frames), generation);
        *attachment = Some(Attachment {
            pipeline: stream.pipeline.clone(),
            appsink: stream.appsink.clone(),
        });
    }

    fn detach(&self) {
        let mut attachment = self.lock_attachment();
        if let Some(previous) = attachment.take() {
            previous
                .appsink
                .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
            self.frames.generation.fetch_add(1, Ordering::AcqRel);
            *self.frames.latest() = None;
            debug!("Stream detached from sink");
        }
    }

    fn play(&self) -> Result<(), SinkError> {
        let attachment = self.lock_attachment();
        let attachment = attachment.as_ref().ok_or(SinkError::NotAttached)?;

        let (_, current, _) = attachment.pipeline.state(gstreamer::ClockTime::ZERO);
        if current == gstreamer::State::Playing {
            return Ok(());
        }

        attachment
            .pipeline
            .set_state(gstreamer::State::Playing)
            .map(|_| ())
            .map_err(|e| {
                warn!(error = %e, "Failed to start playback");
                SinkError::Backend(format!("Failed to start playback: {}", e))
            })
    }

    fn intrinsic_size(&self) -> Option<FrameSize> {
        let (_, info) = self.latest_frame()?;
        Some(FrameSize::new(info.width(), info.height()))
    }

    fn draw_frame(&self, target: &mut RasterBuffer) -> Result<(), SinkError> {
        if !self.is_attached() {
            return Err(SinkError::NotAttached);
        }
        let (sample, info) = self.latest_frame().ok_or(SinkError::NoFrame)?;

        let actual = FrameSize::new(info.width(), info.height());
        if actual != target.size() {
            return Err(SinkError::SizeMismatch {
                expected: target.size(),
                actual,
            });
        }

        let buffer = sample.buffer().ok_or(SinkError::NoFrame)?;
        let map = buffer
            .map_readable()
            .map_err(|e| SinkError::Backend(format!("Failed to map frame: {}", e)))?;
        let stride = usize::try_from(info.stride()[0])
            .map_err(|_| SinkError::Backend("Negative row stride".to_string()))?;

        target.copy_from_rows(map.as_slice(), stride, 3)
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("attachment", &self.attachment())
            .field("attached", &self.is_attached())
            .finish()
    }
}
