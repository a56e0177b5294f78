use std::path::PathBuf;

use tokio::sync::watch;

use crate::common::Frame;
use crate::error::FailureReason;
use crate::pipeline::{Render, RequestState};
use crate::transmit::Variant;

/// Everything the view needs, republished after every transition.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub variant: Variant,
    pub state: RequestState,
    pub render: Render,
    pub generation: u64,
    pub last_error: Option<FailureReason>,
    pub selected_file: Option<PathBuf>,
    /// Live frames while the camera stream is held.
    pub preview: Option<watch::Receiver<Option<Frame>>>,
    /// Number of requests handed to the transmitter this session.
    pub transmissions: u64,
}

impl SessionSnapshot {
    pub fn camera_active(&self) -> bool {
        self.preview.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }
}
