// SPDX-License-Identifier: GPL-3.0-only

//! Pending device requests handed to the host
//!
//! The controller does not spawn anything. Activating it yields an
//! [`Acquisition`] which the host drives to completion and hands back as an
//! [`AcquisitionOutcome`].

use crate::backends::camera::DeviceStream;
use crate::errors::AcquisitionError;
use futures::future::BoxFuture;
use std::sync::{Mutex, PoisonError, Weak};
use tracing::{debug, warn};

/// Identifies one acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub(crate) u64);

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Slot naming the attempt whose platform request is outstanding
pub(crate) type InFlightSlot = Mutex<Option<AttemptId>>;

/// Clears the controller's in-flight slot when an attempt is abandoned
///
/// Travels from the [`Acquisition`] into its [`AcquisitionOutcome`], so
/// dropping either one (or the task awaiting [`Acquisition::run`]) frees the
/// controller to start a new attempt.
struct InFlightGuard {
    attempt: AttemptId,
    slot: Weak<InFlightSlot>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let Some(slot) = self.slot.upgrade() else {
            return;
        };
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if *slot == Some(self.attempt) {
            debug!(attempt = %self.attempt, "Acquisition abandoned before completion");
            *slot = None;
        }
    }
}

/// A device request in flight
#[must_use = "an acquisition does nothing unless run and handed back to the controller"]
pub struct Acquisition<S: DeviceStream> {
    attempt: AttemptId,
    request: BoxFuture<'static, Result<S, AcquisitionError>>,
    guard: InFlightGuard,
}

impl<S: DeviceStream> Acquisition<S> {
    pub(crate) fn new(
        attempt: AttemptId,
        request: BoxFuture<'static, Result<S, AcquisitionError>>,
        slot: Weak<InFlightSlot>,
    ) -> Self {
        Self {
            attempt,
            request,
            guard: InFlightGuard { attempt, slot },
        }
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// Wait for the platform's answer
    pub async fn run(self) -> AcquisitionOutcome<S> {
        let Acquisition {
            attempt,
            request,
            guard,
        } = self;
        let result = request.await;
        AcquisitionOutcome {
            attempt,
            result: Some(result),
            _guard: guard,
        }
    }
}

impl<S: DeviceStream> std::fmt::Debug for Acquisition<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquisition")
            .field("attempt", &self.attempt)
            .finish()
    }
}

/// The platform's answer to one attempt
///
/// An outcome that is dropped before the controller takes its stream stops
/// that stream, so a result can never leak the device.
pub struct AcquisitionOutcome<S: DeviceStream> {
    attempt: AttemptId,
    result: Option<Result<S, AcquisitionError>>,
    _guard: InFlightGuard,
}

impl<S: DeviceStream> AcquisitionOutcome<S> {
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.result, Some(Ok(_)))
    }

    /// The classified failure, if the attempt failed
    pub fn error(&self) -> Option<&AcquisitionError> {
        match &self.result {
            Some(Err(err)) => Some(err),
            _ => None,
        }
    }

    pub(crate) fn take(&mut self) -> Option<Result<S, AcquisitionError>> {
        self.result.take()
    }
}

impl<S: DeviceStream> Drop for AcquisitionOutcome<S> {
    fn drop(&mut self) {
        if let Some(Ok(mut stream)) = self.result.take() {
            warn!(attempt = %self.attempt, "Acquisition outcome dropped unhandled, stopping its stream");
            stream.stop();
        }
    }
}

impl<S: DeviceStream> std::fmt::Debug for AcquisitionOutcome<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionOutcome")
            .field("attempt", &self.attempt)
            .field("ok", &self.is_ok())
            .finish()
    }
}
