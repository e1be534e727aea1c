// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Default capture request profile
pub mod profile {
    /// Ideal width (4K UHD)
    pub const IDEAL_WIDTH: u32 = 3840;

    /// Ideal height (4K UHD)
    pub const IDEAL_HEIGHT: u32 = 2160;

    /// Ideal frame rate
    pub const IDEAL_FPS: u32 = 60;

    /// Minimum acceptable width (720p)
    pub const MIN_WIDTH: u32 = 1280;

    /// Minimum acceptable height (720p)
    pub const MIN_HEIGHT: u32 = 720;

    /// Minimum acceptable frame rate
    pub const MIN_FPS: u32 = 30;
}

/// Still capture settings
pub mod capture {
    /// JPEG quality for captured stills (0-100), equivalent to 0.95
    pub const JPEG_QUALITY: u8 = 95;

    /// Default file prefix for saved stills
    pub const FILE_PREFIX: &str = "capture";
}

/// User-facing text for acquisition failures
pub mod messages {
    pub const PERMISSION_TITLE: &str = "Camera access denied";

    pub const PERMISSION_MESSAGE: &str = "Camera access was refused. Check your system privacy \
         settings and device permissions (for example membership of the video group), then \
         try again.";

    pub const HARDWARE_TITLE: &str = "Camera unavailable";

    pub const HARDWARE_MESSAGE: &str = "The camera is not responding. Make sure it is \
         connected and not in use by another application, then try again.";
}

/// GStreamer pipeline settings
pub mod pipeline {
    /// Maximum buffers queued in the appsink
    pub const MAX_BUFFERS: u32 = 2;

    /// Output format delivered to the frame sink (3 bytes per pixel, no alpha)
    pub const OUTPUT_FORMAT: &str = "RGB";

    /// Default device node when none is configured and enumeration finds nothing
    pub const DEFAULT_DEVICE: &str = "/dev/video0";
}

/// Timing constants
pub mod timing {
    /// Log frame statistics every N frames
    pub const FRAME_LOG_INTERVAL: u64 = 120;

    /// Timeout for pipeline stop (seconds)
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Timeout for reaching READY while opening a device (seconds)
    pub const OPEN_TIMEOUT_SECS: u64 = 5;

    /// Default wait for the first frame after activation (seconds)
    pub const PLAYBACK_TIMEOUT_SECS: u64 = 5;

    /// Default camera warm-up before the first still (milliseconds)
    pub const WARMUP_MS: u64 = 500;
}

/// Application identity
pub mod app_info {
    /// Directory name under the user config dir
    pub const CONFIG_DIR: &str = "camera-capture";

    /// Config file name
    pub const CONFIG_FILE: &str = "config.json";

    /// Directory name under the user pictures dir
    pub const PICTURES_DIR: &str = "camera";

    /// Get the crate version
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_floor_below_ideal() {
        assert!(profile::MIN_WIDTH <= profile::IDEAL_WIDTH);
        assert!(profile::MIN_HEIGHT <= profile::IDEAL_HEIGHT);
        assert!(profile::MIN_FPS <= profile::IDEAL_FPS);
    }
}
