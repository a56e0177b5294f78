use crate::error::FailureReason;
use crate::pipeline::RecognitionResult;

/// Where the session is in the capture/upload cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Capturing,
    Uploading,
    Succeeded(RecognitionResult),
    Failed(FailureReason),
}

impl RequestState {
    pub fn name(&self) -> &'static str {
        match self {
            RequestState::Idle => "Idle",
            RequestState::Capturing => "Capturing",
            RequestState::Uploading => "Uploading",
            RequestState::Succeeded(_) => "Succeeded",
            RequestState::Failed(_) => "Failed",
        }
    }

    /// A new capture is only allowed once nothing is in flight.
    pub fn accepts_capture(&self) -> bool {
        matches!(
            self,
            RequestState::Idle | RequestState::Succeeded(_) | RequestState::Failed(_)
        )
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, RequestState::Capturing | RequestState::Uploading)
    }

    pub fn result(&self) -> Option<&RecognitionResult> {
        match self {
            RequestState::Succeeded(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CaptureStarted,
    CaptureFailed(FailureReason),
    UploadStarted,
    UploadSucceeded(RecognitionResult),
    UploadFailed(FailureReason),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::CaptureStarted => "CaptureStarted",
            Event::CaptureFailed(_) => "CaptureFailed",
            Event::UploadStarted => "UploadStarted",
            Event::UploadSucceeded(_) => "UploadSucceeded",
            Event::UploadFailed(_) => "UploadFailed",
        }
    }
}
