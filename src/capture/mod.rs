pub mod camera_stream;
pub mod captured_image;
pub mod encoder;
pub mod file_picker;
pub mod source;

use std::path::PathBuf;

use tokio::sync::watch;

use crate::common::Frame;
use crate::error::AppError;

pub use camera_stream::CameraStream;
pub use captured_image::CapturedImage;
pub use encoder::FrameEncoder;
pub use file_picker::FilePicker;
pub use source::VideoSource;

/// Where image bytes come from. A deployment uses exactly one mode.
pub enum Acquirer {
    File(FilePicker),
    Camera(CameraAcquirer),
}

impl Acquirer {
    pub async fn acquire(&mut self) -> Result<CapturedImage, AppError> {
        match self {
            Acquirer::File(picker) => picker.read_selected().await,
            Acquirer::Camera(camera) => camera.capture_frame().await,
        }
    }

    pub fn select_file(&mut self, path: PathBuf) -> Result<(), AppError> {
        match self {
            Acquirer::File(picker) => {
                picker.select_file(path);
                Ok(())
            }
            Acquirer::Camera(_) => Err(AppError::Ui(
                "file selection is not available in camera mode".to_string(),
            )),
        }
    }

    pub fn selected_file(&self) -> Option<PathBuf> {
        match self {
            Acquirer::File(picker) => picker.selected().map(PathBuf::from),
            Acquirer::Camera(_) => None,
        }
    }

    pub fn preview(&self) -> Option<watch::Receiver<Option<Frame>>> {
        match self {
            Acquirer::File(_) => None,
            Acquirer::Camera(camera) => camera.preview(),
        }
    }

    /// Releases any held device. Safe to call more than once.
    pub fn deactivate(&mut self) {
        if let Acquirer::Camera(camera) = self {
            camera.deactivate();
        }
    }

    /// Like `deactivate`, but joins the reader thread on the blocking pool.
    pub async fn release(&mut self) {
        if let Acquirer::Camera(camera) = self {
            camera.release().await;
        }
    }
}

/// Owns the camera stream for the lifetime of the capture view.
pub struct CameraAcquirer {
    stream: Option<CameraStream>,
    encoder: FrameEncoder,
}

impl CameraAcquirer {
    pub fn new(encoder: FrameEncoder) -> Self {
        Self {
            stream: None,
            encoder,
        }
    }

    /// Opens the stream. On failure the acquirer stays inactive and the error is returned.
    pub fn activate(&mut self, source: Box<dyn VideoSource>) -> Result<(), AppError> {
        self.deactivate();
        self.stream = Some(CameraStream::open(source)?);
        Ok(())
    }

    pub fn deactivate(&mut self) {
        // Dropping the stream joins its reader thread.
        self.stream = None;
    }

    pub async fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            let source_name = stream.source_name().to_string();
            if let Err(e) = tokio::task::spawn_blocking(move || drop(stream)).await {
                tracing::error!("Releasing camera stream {} failed: {}", source_name, e);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn preview(&self) -> Option<watch::Receiver<Option<Frame>>> {
        self.stream.as_ref().map(CameraStream::subscribe)
    }

    /// Encodes the latest frame on the blocking pool so the session loop keeps running.
    pub async fn capture_frame(&self) -> Result<CapturedImage, AppError> {
        let stream = self.stream.as_ref().ok_or_else(|| {
            AppError::MediaAcquisition("camera stream is not active".to_string())
        })?;
        let frame = stream.latest_frame().ok_or_else(|| {
            AppError::MediaAcquisition(format!(
                "camera stream {} has no frame available",
                stream.source_name()
            ))
        })?;
        let encoder = self.encoder;
        tokio::task::spawn_blocking(move || encoder.encode(frame.image()))
            .await
            .map_err(|e| AppError::MediaAcquisition(format!("frame encoding aborted: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn camera_capture_without_stream_fails() {
        let mut acquirer = Acquirer::Camera(CameraAcquirer::new(FrameEncoder::default()));
        let result = acquirer.acquire().await;
        assert!(matches!(result, Err(AppError::MediaAcquisition(_))));
    }

    #[tokio::test]
    async fn released_camera_no_longer_captures() {
        let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            32,
            24,
            image::Rgb([200, 10, 10]),
        ));
        let mut camera = CameraAcquirer::new(FrameEncoder::default());
        camera
            .activate(Box::new(source::StillImageSource::from_image(
                image,
                std::time::Duration::from_millis(2),
            )))
            .unwrap();
        let mut preview = camera.preview().unwrap();
        preview.wait_for(|frame| frame.is_some()).await.unwrap();

        let captured = camera.capture_frame().await.unwrap();
        assert_eq!(captured.file_name(), "photo.jpg");

        camera.release().await;
        assert!(!camera.is_active());
        assert!(matches!(
            camera.capture_frame().await,
            Err(AppError::MediaAcquisition(_))
        ));
    }

    #[test]
    fn camera_mode_rejects_file_selection() {
        let mut acquirer = Acquirer::Camera(CameraAcquirer::new(FrameEncoder::default()));
        assert!(acquirer.select_file(PathBuf::from("face.png")).is_err());
        assert!(acquirer.selected_file().is_none());
    }
}
