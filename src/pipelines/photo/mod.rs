// SPDX-License-Identifier: MPL-2.0

//! Still photo pipeline
//!
//! ```text
//! RenderingSink → RasterBuffer → PhotoEncoder (JPEG) → EncodedImage → base64 / disk
//! ```
//!
//! Encoding happens synchronously inside a capture call; only the optional
//! save to disk is async.

pub mod encoding;

pub use encoding::{EncodedImage, PhotoEncoder, save_to};
