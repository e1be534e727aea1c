// SPDX-License-Identifier: GPL-3.0-only

//! Stream–sink binding rule
//!
//! Whenever the current stream or the sink reference changes and a stream is
//! present, the stream is attached to the sink and playback is requested. The
//! rule runs on every change, including a sink replacement with the same
//! stream, so the sink always shows the current stream.

use crate::backends::camera::{DeviceStream, RenderingSink};
use std::sync::Arc;
use tracing::{debug, warn};

/// Remembers which sink currently shows a stream
pub(crate) struct StreamSinkBinder<K> {
    attached_to: Option<Arc<K>>,
}

impl<K> StreamSinkBinder<K> {
    pub(crate) fn new() -> Self {
        Self { attached_to: None }
    }

    /// Re-apply the binding for the latest `(stream, sink)` pair
    pub(crate) fn on_stream_or_sink_changed<S>(&mut self, stream: Option<&S>, sink: Option<&Arc<K>>)
    where
        S: DeviceStream,
        K: RenderingSink<S>,
    {
        if let Some(previous) = self.attached_to.take() {
            let still_current = stream.is_some() && sink.is_some_and(|s| Arc::ptr_eq(s, &previous));
            if !still_current {
                debug!("Detaching stream from previous sink");
                previous.detach();
            }
        }

        let (Some(stream), Some(sink)) = (stream, sink) else {
            return;
        };

        debug!(settings = %stream.settings(), "Attaching stream to sink");
        sink.attach(stream);
        if let Err(e) = sink.play() {
            // Playback may still start later (e.g., after a user gesture)
            warn!(error = %e, "Automatic playback start failed");
        }
        self.attached_to = Some(Arc::clone(sink));
    }

    /// Detach from whatever sink is showing a stream
    pub(crate) fn detach<S>(&mut self)
    where
        S: DeviceStream,
        K: RenderingSink<S>,
    {
        if let Some(previous) = self.attached_to.take() {
            debug!("Detaching stream from sink");
            previous.detach();
        }
    }
}
