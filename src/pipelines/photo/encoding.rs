// SPDX-License-Identifier: GPL-3.0-only

//! Still image encoding
//!
//! Captured rasters are encoded as JPEG at a fixed high quality. The payload is
//! kept as raw bytes; [`EncodedImage::to_base64`] renders it for transport
//! without any `data:` URI header.

use crate::constants::capture;
use crate::errors::CaptureError;
use crate::media::raster::RasterBuffer;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Encoded still ready for transport or storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// Base64 payload, no data-URI prefix
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// JPEG encoder for captured rasters
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    quality: u8,
}

impl PhotoEncoder {
    pub fn new() -> Self {
        Self {
            quality: capture::JPEG_QUALITY,
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode a raster as JPEG
    ///
    /// Runs on the caller's thread: capture is a synchronous, pull-style call.
    pub fn encode(&self, raster: &RasterBuffer) -> Result<EncodedImage, CaptureError> {
        let image = raster.image();
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, self.quality);

        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| CaptureError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

        debug!(
            width = image.width(),
            height = image.height(),
            quality = self.quality,
            size = buffer.len(),
            "Encoding complete"
        );

        Ok(EncodedImage {
            data: buffer,
            width: image.width(),
            height: image.height(),
        })
    }

    /// Save an encoded still to `output_dir` under a timestamped name
    pub async fn save(
        &self,
        encoded: &EncodedImage,
        output_dir: &Path,
    ) -> Result<PathBuf, CaptureError> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        let filename = format!("{}_{}.jpg", capture::FILE_PREFIX, timestamp);
        let filepath = output_dir.join(filename);

        save_to(encoded, &filepath).await?;
        Ok(filepath)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Write an encoded still to an explicit path, creating parent directories
pub async fn save_to(encoded: &EncodedImage, path: &Path) -> Result<(), CaptureError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!(path = %path.display(), size = encoded.len(), "Saving capture");
    tokio::fs::write(path, &encoded.data).await?;
    Ok(())
}
