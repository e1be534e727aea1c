// SPDX-License-Identifier: GPL-3.0-only

//! Off-screen RGB surface used by still capture
//!
//! A [`RasterBuffer`] is sized once from the sink's intrinsic dimensions and then
//! filled by the sink. It never carries an alpha channel: 4-byte sources have
//! their alpha dropped while copying.

use crate::backends::camera::types::{FrameSize, SinkError};
use image::{Rgb, RgbImage};

/// Ephemeral RGB raster, one per capture
#[derive(Debug, Clone)]
pub struct RasterBuffer {
    image: RgbImage,
}

impl RasterBuffer {
    /// Allocate a black raster of exactly `size` pixels
    pub fn new(size: FrameSize) -> Self {
        Self {
            image: RgbImage::new(size.width, size.height),
        }
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.image.width(), self.image.height())
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Fill every pixel with a single colour
    pub fn fill(&mut self, rgb: [u8; 3]) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgb(rgb);
        }
    }

    /// Copy packed RGB (3 bpp) or RGBx/RGBA (4 bpp) rows into the raster
    ///
    /// `stride` is the source row length in bytes and may include padding.
    /// The source must cover exactly the raster's dimensions.
    pub fn copy_from_rows(
        &mut self,
        data: &[u8],
        stride: usize,
        bytes_per_pixel: usize,
    ) -> Result<(), SinkError> {
        if bytes_per_pixel != 3 && bytes_per_pixel != 4 {
            return Err(SinkError::Backend(format!(
                "Unsupported pixel stride: {} bytes",
                bytes_per_pixel
            )));
        }

        let width = self.image.width() as usize;
        let height = self.image.height() as usize;
        let row_bytes = width * bytes_per_pixel;
        if stride < row_bytes {
            return Err(SinkError::Backend(format!(
                "Row stride {} shorter than row ({} bytes)",
                stride, row_bytes
            )));
        }
        if height > 0 && data.len() < (height - 1) * stride + row_bytes {
            return Err(SinkError::Backend(format!(
                "Frame buffer too short: {} bytes for {}x{}",
                data.len(),
                width,
                height
            )));
        }

        let dst = self.image.as_mut();
        for y in 0..height {
            let src_row = &data[y * stride..y * stride + row_bytes];
            let dst_row = &mut dst[y * width * 3..(y + 1) * width * 3];
            if bytes_per_pixel == 3 {
                dst_row.copy_from_slice(src_row);
            } else {
                for (dst_px, src_px) in dst_row.chunks_exact_mut(3).zip(src_row.chunks_exact(4)) {
                    dst_px.copy_from_slice(&src_px[..3]);
                }
            }
        }

        Ok(())
    }
}
