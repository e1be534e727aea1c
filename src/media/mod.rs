// SPDX-License-Identifier: MPL-2.0

//! Media buffers shared by the sink and the photo pipeline
//!
//! - [`raster`]: RGB surface a sink draws its current frame into

pub mod raster;

pub use raster::RasterBuffer;
