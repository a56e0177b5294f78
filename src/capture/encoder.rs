use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::capture::CapturedImage;
use crate::config::CaptureSettings;
use crate::error::AppError;

/// Draws a frame into a fixed-size raster and encodes it as JPEG.
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    width: u32,
    height: u32,
    quality: u8,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(640, 480, 90)
    }
}

impl FrameEncoder {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width,
            height,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn from_settings(settings: &CaptureSettings) -> Self {
        Self::new(settings.width, settings.height, settings.jpeg_quality)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn encode(&self, image: &DynamicImage) -> Result<CapturedImage, AppError> {
        // Stretch to the target raster, same as drawing the frame onto a fixed canvas.
        let raster = if image.width() == self.width && image.height() == self.height {
            image.to_rgb8()
        } else {
            image
                .resize_exact(self.width, self.height, FilterType::Triangle)
                .to_rgb8()
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality)
            .encode_image(&raster)
            .map_err(|e| AppError::MediaAcquisition(format!("JPEG encoding failed: {}", e)))?;

        tracing::debug!(
            "Encoded {}x{} frame into {} JPEG bytes",
            self.width,
            self.height,
            bytes.len()
        );
        Ok(CapturedImage::jpeg(bytes))
    }
}
