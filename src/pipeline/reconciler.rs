use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::FailureReason;
use crate::pipeline::{Event, RecognitionResult, RequestState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{event} is not valid while {state}")]
pub struct InvalidTransition {
    pub state: &'static str,
    pub event: &'static str,
}

/// Computes the state that follows `event`. Illegal pairs leave the caller's state untouched.
pub fn transition(state: &RequestState, event: Event) -> Result<RequestState, InvalidTransition> {
    match (state, event) {
        (RequestState::Idle | RequestState::Succeeded(_) | RequestState::Failed(_), Event::CaptureStarted) => {
            Ok(RequestState::Capturing)
        }
        // Acquisition problems never reach Uploading; the prior result is already gone.
        (RequestState::Capturing, Event::CaptureFailed(_)) => Ok(RequestState::Idle),
        (RequestState::Capturing, Event::UploadStarted) => Ok(RequestState::Uploading),
        (RequestState::Uploading, Event::UploadSucceeded(result)) => {
            Ok(RequestState::Succeeded(result))
        }
        (RequestState::Uploading, Event::UploadFailed(reason)) => Ok(RequestState::Failed(reason)),
        (state, event) => Err(InvalidTransition {
            state: state.name(),
            event: event.name(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Capturing,
    Uploading,
}

/// What the view should show for the current state.
#[derive(Debug, Clone, PartialEq)]
pub enum Render {
    Progress(Phase),
    Text {
        generation: u64,
        text: String,
    },
    Recognition {
        generation: u64,
        image_data_uri: Option<String>,
        metadata: Map<String, Value>,
    },
    Error(FailureReason),
}

/// Owns the request state machine for one session.
#[derive(Debug, Default)]
pub struct Reconciler {
    state: RequestState,
    generation: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Counts successful requests; each new result gets a fresh generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn apply(&mut self, event: Event) -> Result<&RequestState, InvalidTransition> {
        let from = self.state.name();
        let event_name = event.name();
        let next = transition(&self.state, event)?;
        if matches!(next, RequestState::Succeeded(_)) {
            self.generation += 1;
        }
        self.state = next;
        tracing::debug!("{} --{}--> {}", from, event_name, self.state.name());
        Ok(&self.state)
    }

    pub fn render(&self) -> Render {
        match &self.state {
            RequestState::Idle => Render::Progress(Phase::Idle),
            RequestState::Capturing => Render::Progress(Phase::Capturing),
            RequestState::Uploading => Render::Progress(Phase::Uploading),
            RequestState::Succeeded(RecognitionResult::Text(text)) => Render::Text {
                generation: self.generation,
                text: text.clone(),
            },
            RequestState::Succeeded(RecognitionResult::Recognition(payload)) => {
                Render::Recognition {
                    generation: self.generation,
                    image_data_uri: payload.image_data_uri(),
                    metadata: payload.metadata.clone(),
                }
            }
            RequestState::Failed(reason) => Render::Error(reason.clone()),
        }
    }
}
