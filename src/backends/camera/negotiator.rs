// SPDX-License-Identifier: GPL-3.0-only

//! Device negotiation
//!
//! Turns a [`CaptureRequestProfile`] into either an open stream or a classified
//! [`AcquisitionError`]. There is no retry here; a new attempt only happens when
//! the host re-activates the controller.

use super::{CaptureRequestProfile, DevicePlatform, DeviceStream};
use crate::errors::AcquisitionError;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{info, warn};

/// Requests devices from a platform and classifies failures
pub struct DeviceNegotiator<P: DevicePlatform> {
    platform: Arc<P>,
}

impl<P: DevicePlatform> DeviceNegotiator<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform: Arc::new(platform),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Ask the platform for a stream matching `profile`
    ///
    /// The profile is passed through untouched: the platform chooses within the
    /// ideal/minimum range and whatever it grants is logged as the final
    /// characteristics.
    pub fn acquire(
        &self,
        profile: &CaptureRequestProfile,
    ) -> BoxFuture<'static, Result<P::Stream, AcquisitionError>> {
        info!(profile = %profile, "Requesting capture device");

        let request = self.platform.open(profile);
        async move {
            match request.await {
                Ok(stream) => {
                    info!(
                        settings = %stream.settings(),
                        tracks = stream.track_count(),
                        "Capture device granted"
                    );
                    Ok(stream)
                }
                Err(err) => {
                    let classified = AcquisitionError::classify(&err);
                    warn!(error = %err, kind = %classified.kind, "Capture device request failed");
                    Err(classified)
                }
            }
        }
        .boxed()
    }
}
