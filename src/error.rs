use serde::{Deserialize, Serialize};
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Media acquisition failed: {0}")]
    MediaAcquisition(String),
    #[error("Transmission failed: {0}")]
    Transmission(String),
    #[error("Failed to decode recognition response: {0}")]
    Decode(String),
    #[error("A capture is already in progress ({0})")]
    Busy(String),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Capture session is no longer running")]
    SessionClosed,
    #[error("UI error: {0}")]
    Ui(String),
}

/// Coarse classification of an [`AppError`], kept alongside the message
/// whenever an error is recorded in session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    MediaAcquisition,
    Transmission,
    Decode,
    Busy,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::MediaAcquisition(_) => ErrorKind::MediaAcquisition,
            AppError::Transmission(_) => ErrorKind::Transmission,
            AppError::Decode(_) => ErrorKind::Decode,
            AppError::Busy(_) => ErrorKind::Busy,
            AppError::Config(_) | AppError::SessionClosed | AppError::Ui(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// An error as recorded in session state: the kind survives, the source does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AppError> for FailureReason {
    fn from(error: &AppError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<AppError> for FailureReason {
    fn from(error: AppError) -> Self {
        Self::from(&error)
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}
