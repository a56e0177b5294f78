use std::path::{Path, PathBuf};

use crate::capture::CapturedImage;
use crate::error::AppError;

/// Holds the user's file choice. Nothing is read until a capture is triggered.
#[derive(Debug, Default)]
pub struct FilePicker {
    selected: Option<PathBuf>,
}

impl FilePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::debug!("Selected file {}", path.display());
        self.selected = Some(path);
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    /// Reads the selected file as-is; no type or size checks are made.
    pub async fn read_selected(&self) -> Result<CapturedImage, AppError> {
        let path = self
            .selected
            .as_ref()
            .ok_or_else(|| AppError::MediaAcquisition("no file selected".to_string()))?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AppError::MediaAcquisition(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(CapturedImage::from_file(bytes, path))
    }
}
