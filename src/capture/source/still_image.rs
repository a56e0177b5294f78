use std::path::PathBuf;
use std::time::Duration;

use image::DynamicImage;

use crate::capture::source::VideoSource;
use crate::error::AppError;

/// Replays one image as a live feed at a fixed frame interval.
pub struct StillImageSource {
    name: String,
    path: Option<PathBuf>,
    image: Option<DynamicImage>,
    interval: Duration,
    opened: bool,
}

impl StillImageSource {
    pub fn from_path(path: PathBuf, interval: Duration) -> Self {
        Self {
            name: format!("still:{}", path.display()),
            path: Some(path),
            image: None,
            interval,
            opened: false,
        }
    }

    pub fn from_image(image: DynamicImage, interval: Duration) -> Self {
        Self {
            name: "still:memory".to_string(),
            path: None,
            image: Some(image),
            interval,
            opened: false,
        }
    }
}

impl VideoSource for StillImageSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<(), AppError> {
        if let Some(path) = &self.path {
            let image = image::open(path).map_err(|e| {
                AppError::MediaAcquisition(format!("cannot open {}: {}", path.display(), e))
            })?;
            self.image = Some(image);
        }
        if self.image.is_none() {
            return Err(AppError::MediaAcquisition(format!(
                "{} has no image to replay",
                self.name
            )));
        }
        self.opened = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<DynamicImage>, AppError> {
        if !self.opened {
            return Err(AppError::MediaAcquisition(format!(
                "{} read before open",
                self.name
            )));
        }
        std::thread::sleep(self.interval);
        Ok(self.image.clone())
    }

    fn close(&mut self) {
        self.opened = false;
        if self.path.is_some() {
            self.image = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn replays_the_same_image_once_opened() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(
            4,
            4,
            Rgb([9, 9, 9]),
        ));
        let mut source = StillImageSource::from_image(image, Duration::from_millis(1));

        assert!(source.read_frame().is_err());
        source.open().unwrap();
        let frame = source.read_frame().unwrap().unwrap();
        assert_eq!(frame.width(), 4);
    }

    #[test]
    fn missing_file_fails_to_open() {
        let mut source = StillImageSource::from_path(
            PathBuf::from("/definitely/not/here.jpg"),
            Duration::from_millis(1),
        );
        assert!(matches!(source.open(), Err(AppError::MediaAcquisition(_))));
    }
}
