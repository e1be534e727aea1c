// SPDX-License-Identifier: GPL-3.0-only

//! Still capture capability
//!
//! A [`CaptureHandle`] is the only way to pull a still out of a controller. It
//! holds a weak reference to the controller's shared state plus the binding
//! generation it was issued for, so it stops working as soon as the stream it
//! was issued for is released, the sink is swapped, or the controller is
//! dropped.

use crate::media::raster::RasterBuffer;
use crate::pipelines::photo::{EncodedImage, PhotoEncoder};
use std::sync::Weak;
use tracing::{debug, warn};

/// Something that can rasterize the current live frame for a given binding
pub(crate) trait CaptureTarget: Send + Sync {
    /// Returns `None` unless the target is ready and still on `binding`
    fn sample(&self, binding: u64) -> Option<RasterBuffer>;
}

/// Pull-style capture capability handed to the host
#[derive(Clone)]
pub struct CaptureHandle {
    target: Weak<dyn CaptureTarget>,
    binding: u64,
    encoder: PhotoEncoder,
}

impl CaptureHandle {
    pub(crate) fn new(target: Weak<dyn CaptureTarget>, binding: u64, encoder: PhotoEncoder) -> Self {
        Self {
            target,
            binding,
            encoder,
        }
    }

    /// Encode the frame currently on screen
    ///
    /// Returns `None` when the controller is not ready, the handle is stale,
    /// or the sink has no frame with valid dimensions. That is a normal
    /// "not available yet" answer, not an error. Repeated calls re-sample.
    pub fn capture(&self) -> Option<EncodedImage> {
        let target = self.target.upgrade()?;
        let raster = target.sample(self.binding)?;

        match self.encoder.encode(&raster) {
            Ok(encoded) => {
                debug!(
                    binding = self.binding,
                    width = encoded.width,
                    height = encoded.height,
                    "Captured still"
                );
                Some(encoded)
            }
            Err(e) => {
                warn!(error = %e, "Failed to encode captured frame");
                None
            }
        }
    }

    /// Binding generation this handle was issued for
    pub fn binding(&self) -> u64 {
        self.binding
    }

    /// Whether the issuing controller still exists
    pub fn is_attached(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("binding", &self.binding)
            .field("attached", &self.is_attached())
            .finish()
    }
}
