use std::path::Path;

use chrono::{DateTime, Utc};
use image::ImageFormat;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Encoded image bytes ready for one upload. Moved into the transmitter and
/// dropped once that request settles.
#[derive(Debug)]
pub struct CapturedImage {
    bytes: Vec<u8>,
    file_name: String,
    mime_type: String,
    captured_at: DateTime<Utc>,
}

impl CapturedImage {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            captured_at: Utc::now(),
        }
    }

    /// A camera capture, always sent as `photo.jpg`.
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "photo.jpg", "image/jpeg")
    }

    /// A user-selected file; the MIME type is guessed from the extension and never validated.
    pub fn from_file(bytes: Vec<u8>, path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = ImageFormat::from_path(path)
            .map(|format| format.to_mime_type())
            .unwrap_or(FALLBACK_MIME);
        Self::new(bytes, file_name, mime_type)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
