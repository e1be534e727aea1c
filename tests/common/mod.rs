// SPDX-License-Identifier: MPL-2.0

//! Hardware-free platform and sink used by the integration tests
//!
//! Device opens stay pending until the test resolves them through [`Probe`],
//! so every interleaving of activation and completion can be driven by hand.

#![allow(dead_code)]

use camera_capture::CameraController;
use camera_capture::backends::camera::{
    CaptureRequestProfile, DevicePlatform, DeviceStream, FrameSize, PlatformError,
    PlatformResult, RenderingSink, SinkError, StreamSettings,
};
use camera_capture::media::raster::RasterBuffer;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub type TestController = CameraController<FakePlatform, FakeSink>;

/// Records everything the fake platform did
#[derive(Default)]
pub struct Probe {
    opens: AtomicUsize,
    next_id: AtomicUsize,
    pending: Mutex<VecDeque<oneshot::Sender<PlatformResult<FakeStream>>>>,
    created: Mutex<Vec<usize>>,
    stops: Mutex<HashMap<usize, usize>>,
    profiles: Mutex<Vec<CaptureRequestProfile>>,
}

impl Probe {
    /// Number of `open` calls the platform received
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of opens still waiting for an answer
    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn profiles(&self) -> Vec<CaptureRequestProfile> {
        self.profiles.lock().unwrap().clone()
    }

    /// Resolve the oldest pending open with a fresh stream and return its id
    pub fn grant(self: &Arc<Self>) -> usize {
        let sender = self
            .pending
            .lock()
            .unwrap()
            .pop_front()
            .expect("no pending open to grant");
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stream = FakeStream {
            id,
            probe: Arc::clone(self),
            stopped: false,
        };
        if sender.send(Ok(stream)).is_ok() {
            self.created.lock().unwrap().push(id);
        }
        id
    }

    /// Resolve the oldest pending open with a failure
    pub fn fail(&self, err: PlatformError) {
        let sender = self
            .pending
            .lock()
            .unwrap()
            .pop_front()
            .expect("no pending open to fail");
        let _ = sender.send(Err(err));
    }

    /// How many times stream `id` was stopped
    pub fn stop_count(&self, id: usize) -> usize {
        self.stops.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    /// Streams handed out and never stopped
    pub fn live_streams(&self) -> Vec<usize> {
        let stops = self.stops.lock().unwrap();
        self.created
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|id| !stops.contains_key(id))
            .collect()
    }
}

pub struct FakeStream {
    pub id: usize,
    probe: Arc<Probe>,
    stopped: bool,
}

impl DeviceStream for FakeStream {
    fn track_count(&self) -> usize {
        1
    }

    fn settings(&self) -> StreamSettings {
        StreamSettings {
            size: FrameSize::new(1920, 1080),
            framerate: None,
            media_type: "video/x-raw".to_string(),
            device: format!("fake{}", self.id),
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
        *self.probe.stops.lock().unwrap().entry(self.id).or_insert(0) += 1;
    }
}

pub struct FakePlatform {
    probe: Arc<Probe>,
}

impl FakePlatform {
    pub fn new() -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        (
            Self {
                probe: Arc::clone(&probe),
            },
            probe,
        )
    }
}

impl DevicePlatform for FakePlatform {
    type Stream = FakeStream;

    fn open(&self, profile: &CaptureRequestProfile) -> BoxFuture<'static, PlatformResult<FakeStream>> {
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        self.probe.profiles.lock().unwrap().push(profile.clone());

        let (sender, receiver) = oneshot::channel();
        self.probe.pending.lock().unwrap().push_back(sender);

        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(PlatformError::Backend("open abandoned".to_string())))
        }
        .boxed()
    }
}

/// Sink that "renders" a solid colour at a configurable size
pub struct FakeSink {
    size: Mutex<Option<FrameSize>>,
    colour: [u8; 3],
    attached: Mutex<Option<usize>>,
    attaches: AtomicUsize,
    detaches: AtomicUsize,
    plays: AtomicUsize,
    refuse_play: AtomicBool,
}

impl FakeSink {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            size: Mutex::new(Some(FrameSize::new(width, height))),
            colour: [10, 120, 240],
            attached: Mutex::new(None),
            attaches: AtomicUsize::new(0),
            detaches: AtomicUsize::new(0),
            plays: AtomicUsize::new(0),
            refuse_play: AtomicBool::new(false),
        })
    }

    pub fn colour(&self) -> [u8; 3] {
        self.colour
    }

    /// Change (or clear) the frame size the sink reports
    pub fn set_size(&self, size: Option<FrameSize>) {
        *self.size.lock().unwrap() = size;
    }

    /// Make every playback request fail, as an autoplay restriction would
    pub fn refuse_play(&self, refuse: bool) {
        self.refuse_play.store(refuse, Ordering::SeqCst);
    }

    pub fn attached_stream(&self) -> Option<usize> {
        *self.attached.lock().unwrap()
    }

    pub fn attaches(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    pub fn detaches(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl RenderingSink<FakeStream> for FakeSink {
    fn attach(&self, stream: &FakeStream) {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        *self.attached.lock().unwrap() = Some(stream.id);
    }

    fn detach(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
        *self.attached.lock().unwrap() = None;
    }

    fn play(&self) -> Result<(), SinkError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if self.refuse_play.load(Ordering::SeqCst) {
            return Err(SinkError::Backend("autoplay refused".to_string()));
        }
        Ok(())
    }

    fn intrinsic_size(&self) -> Option<FrameSize> {
        self.attached.lock().unwrap().and(*self.size.lock().unwrap())
    }

    fn draw_frame(&self, target: &mut RasterBuffer) -> Result<(), SinkError> {
        if self.attached.lock().unwrap().is_none() {
            return Err(SinkError::NotAttached);
        }
        let actual = (*self.size.lock().unwrap()).ok_or(SinkError::NoFrame)?;
        if actual != target.size() {
            return Err(SinkError::SizeMismatch {
                expected: target.size(),
                actual,
            });
        }
        target.fill(self.colour);
        Ok(())
    }
}

/// Controller over a fake platform with a 1920x1080 sink already set
pub fn controller() -> (TestController, Arc<Probe>, Arc<FakeSink>) {
    let (platform, probe) = FakePlatform::new();
    let sink = FakeSink::new(1920, 1080);
    let mut controller = CameraController::new(platform, CaptureRequestProfile::default());
    controller.set_sink(Some(Arc::clone(&sink)));
    (controller, probe, sink)
}

/// Activate, grant the device and report playback
pub async fn ready_controller() -> (TestController, Arc<Probe>, Arc<FakeSink>, usize) {
    let (mut controller, probe, sink) = controller();
    let acquisition = controller.set_active(true).expect("activation starts an acquisition");
    let id = probe.grant();
    assert!(controller.complete(acquisition.run().await).is_none());
    controller.playback_started();
    (controller, probe, sink, id)
}
