use std::path::PathBuf;
use std::str::FromStr;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::Level;

use crate::error::AppError;
use crate::transmit::Variant;

const CONFIG_FILE: &str = "facecap";
const ENV_PREFIX: &str = "FACECAP";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub capture: CaptureSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub base_url: String,
    pub variant: Variant,
    /// No timeout unless set; a hung request keeps the session in Uploading.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            variant: Variant::FileUpload,
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
    pub frame_interval_ms: u64,
    /// V4L2 device node, used when built with `camera-gstreamer`.
    pub device: Option<String>,
    /// Image replayed as a live feed when no camera device is configured.
    pub still_image: Option<PathBuf>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            jpeg_quality: 90,
            frame_interval_ms: 33,
            device: None,
            still_image: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    pub fn max_level(&self) -> Level {
        Level::from_str(&self.level).unwrap_or(Level::INFO)
    }
}

impl Settings {
    /// Layers `facecap.toml` (optional) and `FACECAP__SECTION__KEY` variables over the defaults.
    pub fn load() -> Result<Self, AppError> {
        let settings = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn from_toml(contents: &str) -> Result<Self, AppError> {
        let settings = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_capture_contract() {
        let settings = Settings::default();
        assert_eq!(settings.capture.width, 640);
        assert_eq!(settings.capture.height, 480);
        assert_eq!(settings.server.variant, Variant::FileUpload);
        assert!(settings.server.request_timeout_secs.is_none());
        assert_eq!(settings.logging.max_level(), Level::INFO);
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let settings = Settings::from_toml(
            r#"
            [server]
            base_url = "http://recognizer.local:5000"
            variant = "camera_recognize"

            [capture]
            still_image = "assets/face.jpg"
            "#,
        )
        .expect("valid settings");

        assert_eq!(settings.server.base_url, "http://recognizer.local:5000");
        assert_eq!(settings.server.variant, Variant::CameraRecognize);
        assert_eq!(settings.capture.jpeg_quality, 90);
        assert_eq!(
            settings.capture.still_image,
            Some(PathBuf::from("assets/face.jpg"))
        );
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let logging = LoggingSettings {
            level: "chatty".to_string(),
        };
        assert_eq!(logging.max_level(), Level::INFO);
    }
}
