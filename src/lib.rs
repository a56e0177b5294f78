pub mod app;
pub mod capture;
pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod transmit;

pub use config::Settings;
pub use error::{AppError, ErrorKind, FailureReason};

pub use pipeline::{RecognitionResult, Reconciler, Render, RequestState};
pub use session::{CaptureSession, CaptureSessionHandle, SessionSnapshot};
pub use transmit::{RecognitionClient, Transmitter, Variant};
