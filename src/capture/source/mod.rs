//! Video sources a camera stream can read from.
//!
//! A source is driven from a dedicated reader thread: `open` once, then
//! `read_frame` in a loop until the stream is cancelled, then `close`.

mod still_image;
#[cfg(feature = "camera-gstreamer")]
mod v4l2;

use std::time::Duration;

use image::DynamicImage;

use crate::config::CaptureSettings;
use crate::error::AppError;

pub use still_image::StillImageSource;
#[cfg(feature = "camera-gstreamer")]
pub use v4l2::V4l2Source;

pub trait VideoSource: Send + 'static {
    fn name(&self) -> &str;

    /// Acquires the underlying device. Permission and missing-device failures surface here.
    fn open(&mut self) -> Result<(), AppError>;

    /// Blocks for at most one frame interval. `Ok(None)` means no frame was ready yet.
    fn read_frame(&mut self) -> Result<Option<DynamicImage>, AppError>;

    fn close(&mut self);
}

/// Picks the configured source: a V4L2 device when built with GStreamer
/// support, otherwise a still image replayed as a live feed.
pub fn from_settings(settings: &CaptureSettings) -> Result<Box<dyn VideoSource>, AppError> {
    let interval = Duration::from_millis(settings.frame_interval_ms.max(1));

    #[cfg(feature = "camera-gstreamer")]
    if let Some(device) = &settings.device {
        return Ok(Box::new(V4l2Source::new(
            device.clone(),
            settings.width,
            settings.height,
            interval,
        )));
    }

    if let Some(path) = &settings.still_image {
        return Ok(Box::new(StillImageSource::from_path(path.clone(), interval)));
    }

    if let Some(device) = &settings.device {
        return Err(AppError::MediaAcquisition(format!(
            "camera device {} configured but camera support was not compiled in",
            device
        )));
    }

    Err(AppError::MediaAcquisition(
        "no camera device or still image configured".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_is_a_media_acquisition_error() {
        let result = from_settings(&CaptureSettings::default());
        assert!(matches!(result, Err(AppError::MediaAcquisition(_))));
    }

    #[test]
    fn still_image_is_used_when_configured() {
        let settings = CaptureSettings {
            still_image: Some("face.jpg".into()),
            ..CaptureSettings::default()
        };
        let source = from_settings(&settings).unwrap();
        assert_eq!(source.name(), "still:face.jpg");
    }
}
