// SPDX-License-Identifier: GPL-3.0-only

//! Camera lifecycle controller
//!
//! Owns the acquire → bind → ready → release cycle of one capture device:
//!
//! ```text
//!           set_active(true)          complete(Ok)         playback_started()
//!   Idle ─────────────────▶ Initializing ─────────▶ StreamAcquired ─────────▶ Ready
//!    ▲                            │ complete(Err)                                │
//!    │                            ▼                                              │
//!    │                          Error                                            │
//!    └──────────────── set_active(false) / release() / drop ◀────────────────────┘
//! ```
//!
//! The controller is driven from the host's control task. It never spawns
//! work: activation returns an [`Acquisition`] that the host runs and hands
//! back through [`CameraController::complete`]. Results that arrive after
//! deactivation are discarded and their streams stopped.

mod acquisition;
mod binder;
mod capture;
mod state;

pub use acquisition::{Acquisition, AcquisitionOutcome, AttemptId};
pub use capture::CaptureHandle;
pub use state::{ControllerStatus, LifecycleState};

use crate::backends::camera::{
    CaptureRequestProfile, DeviceNegotiator, DevicePlatform, DeviceStream, FrameSize,
    RenderingSink,
};
use crate::errors::AcquisitionError;
use crate::media::raster::RasterBuffer;
use crate::pipelines::photo::{EncodedImage, PhotoEncoder};
use acquisition::InFlightSlot;
use binder::StreamSinkBinder;
use capture::CaptureTarget;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// State shared between the controller and the capture handles it issues
struct Shared<S, K> {
    state: LifecycleState,
    error: Option<AcquisitionError>,
    stream: Option<S>,
    sink: Option<Arc<K>>,
    binder: StreamSinkBinder<K>,
    /// Bumped whenever the `(stream, sink)` pair changes or the stream is released
    binding: u64,
}

impl<S, K> Shared<S, K>
where
    S: DeviceStream,
    K: RenderingSink<S>,
{
    fn rebind(&mut self) {
        self.binding += 1;
        let Shared {
            stream,
            sink,
            binder,
            ..
        } = self;
        binder.on_stream_or_sink_changed(stream.as_ref(), sink.as_ref());
    }
}

impl<S, K> CaptureTarget for Mutex<Shared<S, K>>
where
    S: DeviceStream,
    K: RenderingSink<S>,
{
    fn sample(&self, binding: u64) -> Option<RasterBuffer> {
        let shared = self.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.state != LifecycleState::Ready || shared.binding != binding {
            return None;
        }
        shared.stream.as_ref()?;
        let sink = shared.sink.as_ref()?;
        let size = sink.intrinsic_size().filter(FrameSize::is_valid)?;

        let mut raster = RasterBuffer::new(size);
        match sink.draw_frame(&mut raster) {
            Ok(()) => Some(raster),
            Err(e) => {
                debug!(error = %e, "Sink could not rasterize the current frame");
                None
            }
        }
    }
}

/// Lifecycle controller for one capture device and one rendering sink
pub struct CameraController<P, K>
where
    P: DevicePlatform,
    K: RenderingSink<P::Stream>,
{
    negotiator: DeviceNegotiator<P>,
    profile: CaptureRequestProfile,
    encoder: PhotoEncoder,
    shared: Arc<Mutex<Shared<P::Stream, K>>>,
    active: bool,
    processing: bool,
    last_count: Option<u32>,
    next_attempt: u64,
    /// Attempt serving the current activation, until it completes
    current_attempt: Option<AttemptId>,
    /// Attempt whose platform request is outstanding (current or superseded)
    ///
    /// Shared with the acquisition so abandoning it clears the slot.
    in_flight: Arc<InFlightSlot>,
    /// Activation arrived while a superseded attempt was still in flight
    deferred: bool,
    status: watch::Sender<ControllerStatus>,
}

impl<P, K> CameraController<P, K>
where
    P: DevicePlatform,
    K: RenderingSink<P::Stream>,
{
    /// Create an idle controller
    pub fn new(platform: P, profile: CaptureRequestProfile) -> Self {
        Self {
            negotiator: DeviceNegotiator::new(platform),
            profile,
            encoder: PhotoEncoder::new(),
            shared: Arc::new(Mutex::new(Shared {
                state: LifecycleState::Idle,
                error: None,
                stream: None,
                sink: None,
                binder: StreamSinkBinder::new(),
                binding: 0,
            })),
            active: false,
            processing: false,
            last_count: None,
            next_attempt: 0,
            current_attempt: None,
            in_flight: Arc::new(Mutex::new(None)),
            deferred: false,
            status: watch::Sender::new(ControllerStatus::default()),
        }
    }

    pub fn platform(&self) -> &P {
        self.negotiator.platform()
    }

    pub fn profile(&self) -> &CaptureRequestProfile {
        &self.profile
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    pub fn error(&self) -> Option<AcquisitionError> {
        self.lock().error.clone()
    }

    /// Whether an acquisition (current or superseded) is still awaiting the platform
    pub fn is_pending(&self) -> bool {
        self.pending_attempt().is_some()
    }

    /// Drive the activation signal
    ///
    /// A rising edge clears any previous error and returns the acquisition the
    /// host must run, unless a superseded request is still in flight, in which
    /// case the new attempt is returned later from [`Self::complete`]. A
    /// falling edge tears everything down. Repeating the current value does
    /// nothing.
    pub fn set_active(&mut self, active: bool) -> Option<Acquisition<P::Stream>> {
        if active == self.active {
            debug!(active, "Activation unchanged");
            return None;
        }

        if !active {
            self.release();
            return None;
        }

        self.active = true;
        {
            let mut shared = self.lock();
            shared.error = None;
            shared.state = LifecycleState::Initializing;
        }

        let acquisition = match self.pending_attempt() {
            Some(stale) => {
                info!(stale = %stale, "Previous acquisition still pending, deferring new attempt");
                self.deferred = true;
                None
            }
            None => Some(self.begin_attempt()),
        };

        self.publish();
        acquisition
    }

    /// Hand back the platform's answer for an attempt
    ///
    /// Returns a deferred acquisition when retiring a superseded attempt
    /// unblocks one.
    pub fn complete(
        &mut self,
        mut outcome: AcquisitionOutcome<P::Stream>,
    ) -> Option<Acquisition<P::Stream>> {
        let attempt = outcome.attempt();
        let result = outcome.take()?;

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if *in_flight == Some(attempt) {
                *in_flight = None;
            }
        }

        if self.active && self.current_attempt == Some(attempt) {
            self.current_attempt = None;
            match result {
                Ok(stream) => self.install_stream(attempt, stream),
                Err(err) => {
                    warn!(attempt = %attempt, kind = %err.kind, "Camera acquisition failed");
                    let mut shared = self.lock();
                    shared.state = LifecycleState::Error;
                    shared.error = Some(err);
                }
            }
            self.publish();
            return None;
        }

        match result {
            Ok(mut stream) => {
                warn!(attempt = %attempt, "Discarding stream from superseded acquisition");
                stream.stop();
            }
            Err(err) => {
                debug!(attempt = %attempt, error = %err, "Ignoring failure from superseded acquisition");
            }
        }

        self.resume_deferred()
    }

    /// Start the attempt deferred behind a superseded request
    ///
    /// [`Self::complete`] does this on its own. Call it after abandoning a
    /// superseded acquisition without completing it.
    pub fn resume_deferred(&mut self) -> Option<Acquisition<P::Stream>> {
        if !self.deferred || !self.active || self.pending_attempt().is_some() {
            return None;
        }
        self.deferred = false;
        let acquisition = self.begin_attempt();
        self.publish();
        Some(acquisition)
    }

    /// Replace (or remove) the rendering sink
    ///
    /// The binding rule re-runs even when the stream is unchanged. A new sink
    /// has to report playback again before the controller is ready.
    pub fn set_sink(&mut self, sink: Option<Arc<K>>) {
        {
            let mut shared = self.lock();
            let unchanged = match (&shared.sink, &sink) {
                (Some(current), Some(new)) => Arc::ptr_eq(current, new),
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                return;
            }

            debug!(present = sink.is_some(), "Rendering sink changed");
            shared.sink = sink;
            if shared.state == LifecycleState::Ready {
                shared.state = LifecycleState::StreamAcquired;
            }
            shared.rebind();
        }
        self.publish();
    }

    /// The sink started rendering frames
    pub fn playback_started(&mut self) {
        {
            let mut shared = self.lock();
            let bound = shared.stream.is_some() && shared.sink.is_some();
            match shared.state {
                LifecycleState::StreamAcquired if bound => {
                    info!(binding = shared.binding, "Camera ready");
                    shared.state = LifecycleState::Ready;
                }
                state => {
                    debug!(state = %state, "Ignoring playback signal");
                    return;
                }
            }
        }
        self.publish();
    }

    /// Advisory flag forwarded to the presentation layer
    pub fn set_processing_hint(&mut self, processing: bool) {
        if self.processing != processing {
            self.processing = processing;
            self.publish();
        }
    }

    /// Count reported by whatever consumes the captured stills
    pub fn set_last_count(&mut self, count: Option<u32>) {
        if self.last_count != count {
            self.last_count = count;
            self.publish();
        }
    }

    /// Stop the device and return to `Idle`
    ///
    /// Stops every track of the open stream, detaches it from the sink and
    /// clears readiness and error. Any pending acquisition is abandoned; its
    /// result is discarded on arrival. Safe to call repeatedly.
    pub fn release(&mut self) {
        let was_active = std::mem::replace(&mut self.active, false);
        if let Some(attempt) = self.current_attempt.take() {
            info!(attempt = %attempt, "Abandoning pending acquisition");
        }
        self.deferred = false;

        let changed = {
            let mut shared = self.lock();
            let had_stream = if let Some(mut stream) = shared.stream.take() {
                info!(tracks = stream.track_count(), "Stopping camera stream");
                stream.stop();
                shared.binder.detach::<P::Stream>();
                shared.binding += 1;
                true
            } else {
                false
            };

            let changed = was_active
                || had_stream
                || shared.state != LifecycleState::Idle
                || shared.error.is_some();
            shared.state = LifecycleState::Idle;
            shared.error = None;
            changed
        };

        if changed {
            self.publish();
        } else {
            debug!("Release requested with nothing to release");
        }
    }

    /// Capture capability for the current stream
    ///
    /// Present whenever a stream is open; only succeeds once ready.
    pub fn capture_handle(&self) -> Option<CaptureHandle> {
        let binding = {
            let shared = self.lock();
            shared.stream.as_ref()?;
            shared.binding
        };
        let target: Weak<dyn CaptureTarget> =
            Arc::<Mutex<Shared<P::Stream, K>>>::downgrade(&self.shared);
        Some(CaptureHandle::new(target, binding, self.encoder))
    }

    /// Convenience for `capture_handle()?.capture()`
    pub fn capture(&self) -> Option<EncodedImage> {
        self.capture_handle()?.capture()
    }

    /// Current status snapshot
    pub fn status(&self) -> ControllerStatus {
        let (state, error) = {
            let shared = self.lock();
            (shared.state, shared.error.clone())
        };
        ControllerStatus {
            active: self.active,
            state,
            error,
            processing: self.processing,
            last_count: self.last_count,
            capture: self.capture_handle(),
        }
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<ControllerStatus> {
        self.status.subscribe()
    }

    fn begin_attempt(&mut self) -> Acquisition<P::Stream> {
        self.next_attempt += 1;
        let attempt = AttemptId(self.next_attempt);
        self.current_attempt = Some(attempt);
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = Some(attempt);
        info!(attempt = %attempt, "Starting camera acquisition");
        Acquisition::new(
            attempt,
            self.negotiator.acquire(&self.profile),
            Arc::downgrade(&self.in_flight),
        )
    }

    fn pending_attempt(&self) -> Option<AttemptId> {
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn install_stream(&mut self, attempt: AttemptId, stream: P::Stream) {
        let mut shared = self.lock();
        if let Some(mut previous) = shared.stream.take() {
            warn!("Replacing an open stream; stopping the previous one first");
            previous.stop();
        }
        info!(attempt = %attempt, settings = %stream.settings(), "Camera stream acquired");
        shared.stream = Some(stream);
        shared.state = LifecycleState::StreamAcquired;
        shared.rebind();
    }

    fn publish(&self) {
        self.status.send_replace(self.status());
    }

    fn lock(&self) -> MutexGuard<'_, Shared<P::Stream, K>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P, K> Drop for CameraController<P, K>
where
    P: DevicePlatform,
    K: RenderingSink<P::Stream>,
{
    fn drop(&mut self) {
        self.release();
    }
}

impl<P, K> std::fmt::Debug for CameraController<P, K>
where
    P: DevicePlatform,
    K: RenderingSink<P::Stream>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.lock();
        f.debug_struct("CameraController")
            .field("active", &self.active)
            .field("state", &shared.state)
            .field("binding", &shared.binding)
            .field("pending", &self.pending_attempt())
            .finish()
    }
}
