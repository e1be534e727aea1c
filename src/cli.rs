// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking a single still
//! - Capturing stills periodically
//! - Showing and resetting the configuration
//!
//! Each capture command drives a [`CameraController`] the way a GUI host
//! would: run the acquisition it hands out, forward the sink's playback
//! signal, then pull stills through the capture capability.

use camera_capture::backends::camera::v4l2_utils;
use camera_capture::errors::{CameraError, CaptureError};
use camera_capture::pipelines::photo::{EncodedImage, PhotoEncoder, save_to};
use camera_capture::{
    AppResult, CameraController, Config, FrameSink, GstPlatform, PlaybackStarted, RenderingSink,
};
use futures::StreamExt;
use futures::channel::mpsc;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// A controller bound to an in-memory sink
struct Session {
    controller: CameraController<GstPlatform, FrameSink>,
    sink: Arc<FrameSink>,
    playback: mpsc::UnboundedReceiver<PlaybackStarted>,
}

impl Session {
    /// Activate the camera and wait until frames are rendering
    async fn start(config: &Config) -> AppResult<Self> {
        let (sink, playback) = FrameSink::new();
        let sink = Arc::new(sink);

        let platform = GstPlatform::new(config.device_path.clone());
        let mut controller = CameraController::new(platform, config.profile.clone());
        controller.set_sink(Some(Arc::clone(&sink)));

        let mut session = Self {
            controller,
            sink,
            playback,
        };

        let mut next = session.controller.set_active(true);
        while let Some(acquisition) = next.take() {
            debug!(attempt = %acquisition.attempt(), "Running acquisition");
            let outcome = acquisition.run().await;
            next = session.controller.complete(outcome);
        }

        if let Some(err) = session.controller.error() {
            return Err(CameraError::Acquisition(err).into());
        }

        session.wait_for_playback(config.playback_timeout()).await?;
        Ok(session)
    }

    async fn wait_for_playback(&mut self, timeout: Duration) -> AppResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let event = tokio::time::timeout_at(deadline, self.playback.next())
                .await
                .map_err(|_| CameraError::PlaybackTimeout)?
                .ok_or_else(|| CameraError::BackendError("Sink closed".to_string()))?;

            if event.attachment != self.sink.attachment() {
                debug!(attachment = event.attachment, "Ignoring stale playback event");
                continue;
            }

            info!(size = %event.size, "Playback started");
            self.controller.playback_started();
            return Ok(());
        }
    }

    fn capture(&self) -> Option<EncodedImage> {
        self.controller.capture()
    }

    fn stop(&mut self) {
        let _ = self.controller.set_active(false);
    }
}

/// List all available cameras
pub fn list_cameras() -> CliResult {
    let cameras = v4l2_utils::enumerate_devices();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        println!("  {} ({})", camera.name, camera.path);
        println!("      Driver: {}", camera.driver);
        if !camera.resolutions.is_empty() {
            let res_strs: Vec<String> = camera.resolutions.iter().map(|r| r.to_string()).collect();
            println!("      Resolutions: {}", res_strs.join(", "));
        }
        println!();
    }

    Ok(())
}

/// Take a single still
pub fn snap(config: &Config, output: Option<PathBuf>, base64: bool) -> CliResult {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut session = Session::start(config).await?;
        if let Some(size) = session.sink.intrinsic_size() {
            println!("Capture size: {}", size);
        }

        // Let auto exposure settle
        tokio::time::sleep(config.warmup()).await;

        let encoded = session.capture().ok_or(CaptureError::NotReady)?;
        session.stop();

        if base64 {
            println!("{}", encoded.to_base64());
            return Ok(());
        }

        let encoder = PhotoEncoder::new();
        let path = match output {
            Some(path) if !path.is_dir() => {
                save_to(&encoded, &path).await?;
                path
            }
            Some(dir) => encoder.save(&encoded, &dir).await?,
            None => encoder.save(&encoded, &config.output_dir()).await?,
        };

        println!("Photo saved: {}", path.display());
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Capture stills periodically until Ctrl+C or `count` is reached
pub fn watch(config: &Config, interval_secs: u64, count: Option<usize>) -> CliResult {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut session = Session::start(config).await?;

        let mut status = session.controller.subscribe();
        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let snapshot = status.borrow_and_update().clone();
                info!(
                    state = %snapshot.state,
                    processing = snapshot.processing,
                    last_count = ?snapshot.last_count,
                    error = ?snapshot.error,
                    "Camera status"
                );
            }
        });

        tokio::time::sleep(config.warmup()).await;

        let output_dir = config.output_dir();
        let encoder = PhotoEncoder::new();
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        let mut taken: u32 = 0;

        println!("Capturing every {}s, press Ctrl+C to stop", interval_secs.max(1));
        while count.is_none_or(|limit| (taken as usize) < limit) {
            ticker.tick().await;
            if stop_flag.load(Ordering::SeqCst) {
                println!();
                println!("Stopping...");
                break;
            }

            let Some(encoded) = session.capture() else {
                warn!(state = %session.controller.state(), "No frame available, skipping");
                continue;
            };

            session.controller.set_processing_hint(true);
            let saved = encoder.save(&encoded, &output_dir).await;
            session.controller.set_processing_hint(false);

            let path = saved?;
            taken += 1;
            session.controller.set_last_count(Some(taken));
            println!("[{}] {}", taken, path.display());
        }

        session.stop();
        println!("Captured {} stills", taken);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Print (or reset) the configuration
pub fn show_config(loaded: AppResult<Config>, reset: bool) -> CliResult {
    let path = Config::path();

    let config = if reset {
        let config = Config::default();
        let saved = config.save()?;
        println!("Configuration reset: {}", saved.display());
        config
    } else {
        loaded?
    };

    match path {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (no config directory)"),
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
