use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

use crate::capture::{source, Acquirer, CameraAcquirer, FilePicker, FrameEncoder, VideoSource};
use crate::config::Settings;
use crate::error::{AppError, FailureReason};
use crate::session::supervisor::{CaptureSupervisor, PreviewReceiver, SessionCommand};
use crate::session::SessionSnapshot;
use crate::transmit::{RecognitionClient, Transmitter, Variant};

const COMMAND_BUFFER: usize = 32;

/// Cloneable handle used by the view to drive the session.
#[derive(Clone)]
pub struct CaptureSessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl CaptureSessionHandle {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    pub async fn select_file(&self, path: impl Into<PathBuf>) -> Result<(), AppError> {
        let path = path.into();
        debug!("Selecting file {}", path.display());
        self.request(|responder| SessionCommand::SelectFile { path, responder })
            .await?
    }

    /// Acquires an image and starts its upload. Returns once the request is in flight.
    pub async fn capture(&self) -> Result<Uuid, AppError> {
        self.request(|responder| SessionCommand::Capture { responder })
            .await?
    }

    pub async fn activate_camera(
        &self,
        source: Box<dyn VideoSource>,
    ) -> Result<PreviewReceiver, AppError> {
        self.request(|responder| SessionCommand::ActivateCamera { source, responder })
            .await?
    }

    pub async fn deactivate_camera(&self) -> Result<(), AppError> {
        self.request(|responder| SessionCommand::DeactivateCamera { responder })
            .await
    }

    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.request(|responder| SessionCommand::Shutdown { responder })
            .await
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> SessionCommand,
    ) -> Result<R, AppError> {
        let (responder, response_rx) = oneshot::channel();
        self.command_tx
            .send(command(responder))
            .await
            .map_err(|_| AppError::SessionClosed)?;
        response_rx.await.map_err(|_| AppError::SessionClosed)
    }
}

/// The running capture session task. Dropping it stops the session and releases the camera.
pub struct CaptureSession {
    session_task: JoinHandle<()>,
}

impl CaptureSession {
    pub fn spawn(
        variant: Variant,
        acquirer: Acquirer,
        transmitter: Arc<dyn Transmitter>,
        startup_error: Option<FailureReason>,
    ) -> (Self, CaptureSessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (supervisor, snapshot_rx) =
            CaptureSupervisor::new(variant, acquirer, transmitter, startup_error);
        let session_task = tokio::spawn(supervisor.run(command_rx));
        (
            Self { session_task },
            CaptureSessionHandle {
                command_tx,
                snapshot_rx,
            },
        )
    }

    /// Builds the acquirer and transmitter for the configured variant. In camera
    /// mode the stream is acquired immediately; failing to get it is recorded in
    /// the session, not returned.
    pub fn from_settings(settings: &Settings) -> Result<(Self, CaptureSessionHandle), AppError> {
        let transmitter = Arc::new(RecognitionClient::new(&settings.server)?);
        let variant = settings.server.variant;

        let mut startup_error = None;
        let acquirer = if variant.uses_camera() {
            let mut camera = CameraAcquirer::new(FrameEncoder::from_settings(&settings.capture));
            let activated =
                source::from_settings(&settings.capture).and_then(|source| camera.activate(source));
            if let Err(e) = activated {
                error!("Camera unavailable: {}", e);
                startup_error = Some(FailureReason::from(&e));
            }
            Acquirer::Camera(camera)
        } else {
            Acquirer::File(FilePicker::new())
        };

        Ok(Self::spawn(variant, acquirer, transmitter, startup_error))
    }

    pub fn is_finished(&self) -> bool {
        self.session_task.is_finished()
    }

    pub fn stop(&self) {
        self.session_task.abort();
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}
