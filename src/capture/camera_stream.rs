use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::capture::source::VideoSource;
use crate::capture::{CapturedImage, FrameEncoder};
use crate::common::Frame;
use crate::error::AppError;

/// A live video stream, held for as long as the capture view is active.
///
/// The source is read on its own thread and the most recent frame is kept in
/// a watch channel. Dropping the stream cancels the reader, closes the source
/// and joins the thread.
pub struct CameraStream {
    source_name: String,
    cancel_token: CancellationToken,
    reader_thread: Option<std::thread::JoinHandle<()>>,
    frame_rx: watch::Receiver<Option<Frame>>,
}

impl CameraStream {
    pub fn open(mut source: Box<dyn VideoSource>) -> Result<Self, AppError> {
        let source_name = source.name().to_string();
        source.open()?;
        tracing::info!("Camera stream {} acquired", source_name);

        let cancel_token = CancellationToken::new();
        let (frame_tx, frame_rx) = watch::channel(None);
        let mut reader = FrameReader {
            source,
            frame_tx,
            cancel_token: cancel_token.clone(),
        };
        let reader_thread = std::thread::Builder::new()
            .name(format!("camera-{}", source_name))
            .spawn(move || reader.run())
            .map_err(|e| {
                AppError::MediaAcquisition(format!("cannot start camera reader: {}", e))
            })?;

        Ok(Self {
            source_name,
            cancel_token,
            reader_thread: Some(reader_thread),
            frame_rx,
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn is_running(&self) -> bool {
        self.reader_thread
            .as_ref()
            .map(|thread| !thread.is_finished())
            .unwrap_or(false)
    }

    pub fn latest_frame(&self) -> Option<Frame> {
        self.frame_rx.borrow().clone()
    }

    /// A receiver for live preview; yields `None` once the stream has ended.
    pub fn subscribe(&self) -> watch::Receiver<Option<Frame>> {
        self.frame_rx.clone()
    }

    /// Encodes the most recent frame. Fails if the stream has not produced one yet.
    pub fn capture_frame(&self, encoder: &FrameEncoder) -> Result<CapturedImage, AppError> {
        let frame = self.latest_frame().ok_or_else(|| {
            AppError::MediaAcquisition(format!(
                "camera stream {} has no frame available",
                self.source_name
            ))
        })?;
        encoder.encode(frame.image())
    }

    pub fn stop(&mut self) {
        self.cancel_token.cancel();
        if let Some(thread) = self.reader_thread.take() {
            if thread.join().is_err() {
                tracing::error!("Camera reader thread for {} panicked", self.source_name);
            }
            tracing::info!("Camera stream {} released", self.source_name);
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.stop();
    }
}

struct FrameReader {
    source: Box<dyn VideoSource>,
    frame_tx: watch::Sender<Option<Frame>>,
    cancel_token: CancellationToken,
}

impl FrameReader {
    fn run(&mut self) {
        tracing::debug!("Camera reader for {} started", self.source.name());
        while !self.cancel_token.is_cancelled() {
            match self.source.read_frame() {
                Ok(Some(image)) => {
                    self.frame_tx.send_replace(Some(Frame::new(image, Utc::now())));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Camera stream {} failed: {}", self.source.name(), e);
                    break;
                }
            }
        }
        // A stale frame must not be captured after the stream ends.
        self.frame_tx.send_replace(None);
        self.source.close();
        tracing::debug!("Camera reader for {} stopped", self.source.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::source::StillImageSource;
    use image::{DynamicImage, ImageBuffer, Rgb};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn still_source() -> Box<dyn VideoSource> {
        let image = DynamicImage::ImageRgb8(ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(
            320,
            240,
            Rgb([10, 20, 30]),
        ));
        Box::new(StillImageSource::from_image(image, Duration::from_millis(2)))
    }

    struct NeverReadySource {
        closed: Arc<AtomicBool>,
    }

    impl VideoSource for NeverReadySource {
        fn name(&self) -> &str {
            "never-ready"
        }

        fn open(&mut self) -> Result<(), AppError> {
            Ok(())
        }

        fn read_frame(&mut self) -> Result<Option<DynamicImage>, AppError> {
            std::thread::sleep(Duration::from_millis(1));
            Ok(None)
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct DeniedSource;

    impl VideoSource for DeniedSource {
        fn name(&self) -> &str {
            "denied"
        }

        fn open(&mut self) -> Result<(), AppError> {
            Err(AppError::MediaAcquisition("permission denied".to_string()))
        }

        fn read_frame(&mut self) -> Result<Option<DynamicImage>, AppError> {
            unreachable!("never opened")
        }

        fn close(&mut self) {}
    }

    #[test]
    fn capture_before_first_frame_is_media_acquisition_error() {
        let closed = Arc::new(AtomicBool::new(false));
        let stream = CameraStream::open(Box::new(NeverReadySource {
            closed: closed.clone(),
        }))
        .unwrap();

        let result = stream.capture_frame(&FrameEncoder::default());
        assert!(matches!(result, Err(AppError::MediaAcquisition(_))));

        drop(stream);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn captures_latest_frame_once_streaming() {
        let stream = CameraStream::open(still_source()).unwrap();
        let mut frames = stream.subscribe();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while frames.borrow_and_update().is_none() {
            assert!(std::time::Instant::now() < deadline, "no frame produced");
            std::thread::sleep(Duration::from_millis(2));
        }

        let captured = stream.capture_frame(&FrameEncoder::default()).unwrap();
        assert_eq!(captured.file_name(), "photo.jpg");
        assert!(!captured.is_empty());
    }

    #[test]
    fn open_failure_is_returned_to_caller() {
        let result = CameraStream::open(Box::new(DeniedSource));
        assert!(matches!(result, Err(AppError::MediaAcquisition(_))));
    }

    #[test]
    fn stop_releases_reader_thread() {
        let mut stream = CameraStream::open(still_source()).unwrap();
        assert!(stream.is_running());
        stream.stop();
        assert!(!stream.is_running());
        assert!(stream.latest_frame().is_none());
    }
}
