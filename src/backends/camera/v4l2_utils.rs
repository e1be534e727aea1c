// SPDX-License-Identifier: GPL-3.0-only

//! Shared V4L2 utility functions
//!
//! Device discovery for the CLI and access probing for the GStreamer platform.
//! Probing opens the node before any pipeline exists so permission problems are
//! reported as such instead of surfacing as a generic pipeline failure.

use super::types::{CameraDevice, FrameSize, PlatformError, PlatformResult};
use crate::constants::pipeline;
use std::io;
use tracing::{debug, info};
use v4l::capability::Flags;
use v4l::framesize::FrameSizeEnum;
use v4l::video::Capture;

/// How many resolutions to keep per device
const MAX_LISTED_RESOLUTIONS: usize = 3;

/// Map an OS error from opening a device node onto a platform error
pub fn classify_io_error(device_path: &str, err: &io::Error) -> PlatformError {
    let detail = format!("{}: {}", device_path, err);
    match err.raw_os_error() {
        Some(libc::EACCES) | Some(libc::EPERM) => PlatformError::PermissionDenied(detail),
        Some(libc::EBUSY) => PlatformError::Busy(detail),
        Some(libc::ENOENT) | Some(libc::ENODEV) | Some(libc::ENXIO) => {
            PlatformError::NotFound(detail)
        }
        _ => match err.kind() {
            io::ErrorKind::PermissionDenied => PlatformError::PermissionDenied(detail),
            io::ErrorKind::NotFound => PlatformError::NotFound(detail),
            _ => PlatformError::Backend(detail),
        },
    }
}

/// Check that `device_path` can be opened and is a video capture device
pub fn probe_device(device_path: &str) -> PlatformResult<()> {
    let device =
        v4l::Device::with_path(device_path).map_err(|e| classify_io_error(device_path, &e))?;
    let caps = device
        .query_caps()
        .map_err(|e| classify_io_error(device_path, &e))?;

    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        return Err(PlatformError::NotFound(format!(
            "{} ({}) is not a video capture device",
            device_path, caps.card
        )));
    }

    debug!(device_path, card = %caps.card, driver = %caps.driver, "Device probe succeeded");
    Ok(())
}

/// Enumerate V4L2 video capture devices
///
/// Nodes that cannot be opened (e.g., permission) are skipped; metadata nodes
/// that uvcvideo exposes next to each camera are filtered out.
pub fn enumerate_devices() -> Vec<CameraDevice> {
    let mut devices = Vec::new();

    for node in v4l::context::enum_devices() {
        let path = node.path().to_string_lossy().to_string();
        let device = match v4l::Device::with_path(&path) {
            Ok(device) => device,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping unopenable node");
                continue;
            }
        };
        let caps = match device.query_caps() {
            Ok(caps) => caps,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping node without capabilities");
                continue;
            }
        };
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            continue;
        }

        let resolutions = list_resolutions(&device);
        devices.push(CameraDevice {
            name: node.name().unwrap_or_else(|| caps.card.clone()),
            path,
            driver: caps.driver.clone(),
            resolutions,
        });
    }

    devices.sort_by(|a, b| a.path.cmp(&b.path));
    info!(count = devices.len(), "V4L2 capture devices enumerated");
    devices
}

/// First capture device on the system, falling back to the conventional node
pub fn default_device_path() -> String {
    enumerate_devices()
        .into_iter()
        .next()
        .map(|device| device.path)
        .unwrap_or_else(|| pipeline::DEFAULT_DEVICE.to_string())
}

/// Largest resolutions supported by a device, best first
fn list_resolutions(device: &v4l::Device) -> Vec<FrameSize> {
    let mut sizes: Vec<FrameSize> = Vec::new();

    let formats = device.enum_formats().unwrap_or_default();
    for format in formats {
        let framesizes = device.enum_framesizes(format.fourcc).unwrap_or_default();
        for framesize in framesizes {
            let size = match framesize.size {
                FrameSizeEnum::Discrete(discrete) => {
                    FrameSize::new(discrete.width, discrete.height)
                }
                FrameSizeEnum::Stepwise(stepwise) => {
                    FrameSize::new(stepwise.max_width, stepwise.max_height)
                }
            };
            if !sizes.contains(&size) {
                sizes.push(size);
            }
        }
    }

    sizes.sort_by_key(|size| std::cmp::Reverse(size.area()));
    sizes.truncate(MAX_LISTED_RESOLUTIONS);
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_permission() {
        let err = io::Error::from_raw_os_error(libc::EACCES);
        assert!(matches!(
            classify_io_error("/dev/video0", &err),
            PlatformError::PermissionDenied(_)
        ));
    }

    #[test]
    fn test_classify_busy_and_missing() {
        let busy = io::Error::from_raw_os_error(libc::EBUSY);
        assert!(matches!(
            classify_io_error("/dev/video0", &busy),
            PlatformError::Busy(_)
        ));

        let missing = io::Error::from_raw_os_error(libc::ENOENT);
        assert!(matches!(
            classify_io_error("/dev/video9", &missing),
            PlatformError::NotFound(_)
        ));
    }

    #[test]
    fn test_classify_other_is_backend() {
        let err = io::Error::from_raw_os_error(libc::EIO);
        assert!(matches!(
            classify_io_error("/dev/video0", &err),
            PlatformError::Backend(_)
        ));
    }

    #[test]
    fn test_probe_missing_node() {
        let result = probe_device("/dev/video-does-not-exist");
        assert!(matches!(result, Err(PlatformError::NotFound(_))));
    }
}
