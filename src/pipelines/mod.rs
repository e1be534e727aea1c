// SPDX-License-Identifier: MPL-2.0

//! Capture pipelines
//!
//! - [`photo`]: still encoding and storage
//!
//! Video recording is not part of this crate.

pub mod photo;
