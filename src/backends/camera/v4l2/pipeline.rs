// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture pipeline construction
//!
//! Pipeline shape:
//!
//! ```text
//! v4l2src ! capsfilter ! [jpegdec !] videoconvert ! appsink (RGB)
//! ```
//!
//! The source is brought to READY on its own first so its probed caps can be
//! intersected with the request range. Each intersecting structure is fixated
//! toward the ideal and the closest one wins.

use super::super::types::{
    CaptureRequestProfile, FrameSize, Framerate, PlatformError, PlatformResult, StreamSettings,
};
use super::super::v4l2_utils;
use crate::constants::{pipeline as consts, timing};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use tracing::{debug, info, warn};

/// Media types the pipeline knows how to turn into RGB
const RAW_MEDIA_TYPE: &str = "video/x-raw";
const JPEG_MEDIA_TYPE: &str = "image/jpeg";

/// One fixated mode the device offered inside the request range
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Mode {
    pub size: FrameSize,
    pub framerate: Option<Framerate>,
    pub media_type: String,
}

/// A built pipeline that is already streaming
pub(crate) struct CapturePipeline {
    pub pipeline: gstreamer::Pipeline,
    pub appsink: AppSink,
    pub settings: StreamSettings,
}

/// Open `device_path` and negotiate a mode inside `profile`
///
/// Blocking; run it off the async executor.
pub(crate) fn build(
    device_path: &str,
    profile: &CaptureRequestProfile,
) -> PlatformResult<CapturePipeline> {
    gstreamer::init().map_err(|e| PlatformError::Backend(format!("GStreamer init: {}", e)))?;

    v4l2_utils::probe_device(device_path)?;
    debug!(facing = %profile.facing, "V4L2 nodes carry no facing information, using selected node");

    let pipeline = gstreamer::Pipeline::builder().name("camera-capture").build();
    let src = make_element("v4l2src", "source")?;
    src.set_property("device", device_path);
    pipeline.add(&src).map_err(backend)?;

    // READY opens the device so the pad reports what the hardware supports
    if pipeline.set_state(gstreamer::State::Ready).is_err() {
        let err = bus_error(&pipeline, device_path);
        let _ = pipeline.set_state(gstreamer::State::Null);
        return Err(err);
    }

    let chosen = match negotiate(&src, profile) {
        Ok(chosen) => chosen,
        Err(err) => {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(err);
        }
    };
    let (mode, caps) = chosen;
    info!(
        device = device_path,
        size = %mode.size,
        framerate = ?mode.framerate,
        media_type = %mode.media_type,
        "Negotiated capture mode"
    );

    let result = link_and_start(&pipeline, &src, &mode, &caps, device_path);
    match result {
        Ok(appsink) => Ok(CapturePipeline {
            pipeline,
            appsink,
            settings: StreamSettings {
                size: mode.size,
                framerate: mode.framerate,
                media_type: mode.media_type,
                device: device_path.to_string(),
            },
        }),
        Err(err) => {
            let _ = pipeline.set_state(gstreamer::State::Null);
            Err(err)
        }
    }
}

/// Stop a pipeline and wait briefly for the device to be released
pub(crate) fn shutdown(pipeline: &gstreamer::Pipeline, appsink: &AppSink) {
    appsink.set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());

    if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
        warn!(error = %e, "Failed to set capture pipeline to NULL");
        return;
    }
    let (result, state, _) =
        pipeline.state(gstreamer::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS));
    match result {
        Ok(_) => debug!(state = ?state, "Capture pipeline stopped"),
        Err(e) => debug!(error = ?e, state = ?state, "Capture pipeline stop did not settle"),
    }
}

fn negotiate(
    src: &gstreamer::Element,
    profile: &CaptureRequestProfile,
) -> PlatformResult<(Mode, gstreamer::Caps)> {
    let pad = src
        .static_pad("src")
        .ok_or_else(|| PlatformError::Backend("v4l2src has no src pad".to_string()))?;
    let probed = pad.query_caps(None);
    debug!(caps = %probed, "Device caps");

    let candidates = probed.intersect(&range_caps(profile));
    if candidates.is_empty() {
        return Err(PlatformError::ConstraintsUnsatisfiable(format!(
            "no mode of at least {} @ {}fps",
            profile.min, profile.min_framerate
        )));
    }

    let target = profile.max_size();
    let mut modes = Vec::new();
    let mut fixed_caps = Vec::new();
    for structure in candidates.iter() {
        let mut s = structure.to_owned();
        s.fixate_field_nearest_int("width", target.width as i32);
        s.fixate_field_nearest_int("height", target.height as i32);
        if s.has_field("framerate") {
            s.fixate_field_nearest_fraction(
                "framerate",
                gstreamer::Fraction::new(
                    profile.ideal_framerate.num as i32,
                    profile.ideal_framerate.denom as i32,
                ),
            );
        }

        let mut caps = gstreamer::Caps::builder_full().structure(s).build();
        caps.fixate();
        if let Some(mode) = caps.structure(0).and_then(mode_from_structure) {
            modes.push(mode);
            fixed_caps.push(caps);
        }
    }

    let index = select_mode(&modes, profile).ok_or_else(|| {
        PlatformError::ConstraintsUnsatisfiable(format!(
            "{} candidate modes, none inside the requested floor",
            modes.len()
        ))
    })?;

    Ok((modes.swap_remove(index), fixed_caps.swap_remove(index)))
}

/// Range caps for every media type we can decode
fn range_caps(profile: &CaptureRequestProfile) -> gstreamer::Caps {
    let min_rate = gstreamer::Fraction::new(
        profile.min_framerate.num as i32,
        profile.min_framerate.denom as i32,
    );
    let ranged = |media_type: &str| {
        gstreamer::Structure::builder(media_type)
            .field(
                "width",
                gstreamer::IntRange::new(profile.min.width as i32, i32::MAX),
            )
            .field(
                "height",
                gstreamer::IntRange::new(profile.min.height as i32, i32::MAX),
            )
            .field(
                "framerate",
                gstreamer::FractionRange::new(min_rate, gstreamer::Fraction::new(i32::MAX, 1)),
            )
            .build()
    };

    gstreamer::Caps::builder_full()
        .structure(ranged(RAW_MEDIA_TYPE))
        .structure(ranged(JPEG_MEDIA_TYPE))
        .build()
}

fn mode_from_structure(s: &gstreamer::StructureRef) -> Option<Mode> {
    let width = s.get::<i32>("width").ok()?;
    let height = s.get::<i32>("height").ok()?;
    let framerate = s
        .get::<gstreamer::Fraction>("framerate")
        .ok()
        .filter(|f| f.numer() > 0 && f.denom() > 0)
        .map(|f| Framerate::new(f.numer() as u32, f.denom() as u32));

    Some(Mode {
        size: FrameSize::new(u32::try_from(width).ok()?, u32::try_from(height).ok()?),
        framerate,
        media_type: s.name().to_string(),
    })
}

/// Pick the mode closest to the ideal
///
/// Ordering: inside the floor, nearest area, nearest framerate, raw before
/// MJPEG (no decode step).
pub(crate) fn select_mode(modes: &[Mode], profile: &CaptureRequestProfile) -> Option<usize> {
    let ideal_area = profile.max_size().area();
    let ideal_fps = profile.ideal_framerate.as_f64();

    modes
        .iter()
        .enumerate()
        .filter(|(_, mode)| profile.accepts(mode.size, mode.framerate))
        .min_by(|(_, a), (_, b)| {
            let area_a = a.size.area().abs_diff(ideal_area);
            let area_b = b.size.area().abs_diff(ideal_area);
            let fps_a = a.framerate.map_or(f64::MAX, |f| (f.as_f64() - ideal_fps).abs());
            let fps_b = b.framerate.map_or(f64::MAX, |f| (f.as_f64() - ideal_fps).abs());
            let raw_a = a.media_type != RAW_MEDIA_TYPE;
            let raw_b = b.media_type != RAW_MEDIA_TYPE;

            area_a
                .cmp(&area_b)
                .then(fps_a.total_cmp(&fps_b))
                .then(raw_a.cmp(&raw_b))
        })
        .map(|(index, _)| index)
}

fn link_and_start(
    pipeline: &gstreamer::Pipeline,
    src: &gstreamer::Element,
    mode: &Mode,
    caps: &gstreamer::Caps,
    device_path: &str,
) -> PlatformResult<AppSink> {
    let filter = make_element("capsfilter", "filter")?;
    filter.set_property("caps", caps);

    let decoder = if mode.media_type == JPEG_MEDIA_TYPE {
        Some(make_element("jpegdec", "decoder")?)
    } else {
        None
    };
    let convert = make_element("videoconvert", "convert")?;

    let appsink = AppSink::builder().name("sink").build();
    appsink.set_caps(Some(
        &gstreamer::Caps::builder(RAW_MEDIA_TYPE)
            .field("format", consts::OUTPUT_FORMAT)
            .build(),
    ));
    appsink.set_property("max-buffers", consts::MAX_BUFFERS);
    appsink.set_property("drop", true);
    appsink.set_property("sync", false);

    let mut chain: Vec<&gstreamer::Element> = vec![src, &filter];
    if let Some(decoder) = &decoder {
        chain.push(decoder);
    }
    chain.push(&convert);
    chain.push(appsink.upcast_ref());

    for element in chain.iter().skip(1) {
        pipeline.add(*element).map_err(backend)?;
    }
    gstreamer::Element::link_many(chain.iter().copied()).map_err(backend)?;

    debug!("Setting capture pipeline to PLAYING");
    if pipeline.set_state(gstreamer::State::Playing).is_err() {
        return Err(bus_error(pipeline, device_path));
    }

    let (result, state, pending) =
        pipeline.state(gstreamer::ClockTime::from_seconds(timing::OPEN_TIMEOUT_SECS));
    debug!(result = ?result, state = ?state, pending = ?pending, "Capture pipeline state");
    if result.is_err() {
        return Err(bus_error(pipeline, device_path));
    }

    Ok(appsink)
}

fn make_element(factory: &str, name: &str) -> PlatformResult<gstreamer::Element> {
    gstreamer::ElementFactory::make(factory)
        .name(name)
        .build()
        .map_err(|e| PlatformError::Backend(format!("Failed to create {}: {}", factory, e)))
}

fn backend(err: impl std::fmt::Display) -> PlatformError {
    PlatformError::Backend(err.to_string())
}

/// Turn the first error on the bus into a platform error
fn bus_error(pipeline: &gstreamer::Pipeline, device_path: &str) -> PlatformError {
    let message = pipeline
        .bus()
        .and_then(|bus| bus.pop_filtered(&[gstreamer::MessageType::Error]));

    let Some(message) = message else {
        return PlatformError::Backend(format!("{}: state change failed", device_path));
    };
    let gstreamer::MessageView::Error(err) = message.view() else {
        return PlatformError::Backend(format!("{}: state change failed", device_path));
    };

    let error = err.error();
    let text = match err.debug() {
        Some(debug) => format!("{} ({})", error.message(), debug),
        None => error.message().to_string(),
    };
    warn!(device = device_path, error = %text, "Capture pipeline error");

    classify_resource_error(error.kind::<gstreamer::ResourceError>(), &text, device_path)
}

/// Map a GStreamer resource error onto the platform error kinds
pub(crate) fn classify_resource_error(
    kind: Option<gstreamer::ResourceError>,
    text: &str,
    device_path: &str,
) -> PlatformError {
    let detail = format!("{}: {}", device_path, text);
    let denied_text = text.contains("Permission denied") || text.contains("not authorized");

    match kind {
        Some(gstreamer::ResourceError::NotAuthorized) => PlatformError::PermissionDenied(detail),
        Some(gstreamer::ResourceError::Busy) => PlatformError::Busy(detail),
        Some(gstreamer::ResourceError::NotFound) => PlatformError::NotFound(detail),
        Some(gstreamer::ResourceError::Settings) => {
            PlatformError::ConstraintsUnsatisfiable(detail)
        }
        _ if denied_text => PlatformError::PermissionDenied(detail),
        _ => PlatformError::Backend(detail),
    }
}
