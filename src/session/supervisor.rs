use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::capture::{Acquirer, VideoSource};
use crate::common::Frame;
use crate::error::{AppError, FailureReason};
use crate::pipeline::{Event, RecognitionResult, Reconciler};
use crate::session::SessionSnapshot;
use crate::transmit::{Transmitter, Variant};

pub type PreviewReceiver = watch::Receiver<Option<Frame>>;

pub enum SessionCommand {
    SelectFile {
        path: PathBuf,
        responder: oneshot::Sender<Result<(), AppError>>,
    },
    Capture {
        responder: oneshot::Sender<Result<Uuid, AppError>>,
    },
    ActivateCamera {
        source: Box<dyn VideoSource>,
        responder: oneshot::Sender<Result<PreviewReceiver, AppError>>,
    },
    DeactivateCamera {
        responder: oneshot::Sender<()>,
    },
    Shutdown {
        responder: oneshot::Sender<()>,
    },
}

struct InFlight {
    request_id: Uuid,
    task: JoinHandle<Result<RecognitionResult, AppError>>,
}

/// Owns the acquirer, the request state machine and the single in-flight request.
pub struct CaptureSupervisor {
    variant: Variant,
    acquirer: Acquirer,
    transmitter: Arc<dyn Transmitter>,
    reconciler: Reconciler,
    last_error: Option<FailureReason>,
    in_flight: Option<InFlight>,
    transmissions: u64,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl CaptureSupervisor {
    pub fn new(
        variant: Variant,
        acquirer: Acquirer,
        transmitter: Arc<dyn Transmitter>,
        startup_error: Option<FailureReason>,
    ) -> (Self, watch::Receiver<SessionSnapshot>) {
        let reconciler = Reconciler::new();
        let initial = SessionSnapshot {
            variant,
            state: reconciler.state().clone(),
            render: reconciler.render(),
            generation: reconciler.generation(),
            last_error: startup_error.clone(),
            selected_file: acquirer.selected_file(),
            preview: acquirer.preview(),
            transmissions: 0,
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        (
            Self {
                variant,
                acquirer,
                transmitter,
                reconciler,
                last_error: startup_error,
                in_flight: None,
                transmissions: 0,
                snapshot_tx,
            },
            snapshot_rx,
        )
    }

    pub async fn run(mut self, mut command_rx: mpsc::Receiver<SessionCommand>) {
        info!("Capture session started ({:?})", self.variant);
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(SessionCommand::Shutdown { responder }) => {
                        self.shutdown().await;
                        let _ = responder.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("All session handles dropped");
                        self.shutdown().await;
                        break;
                    }
                },
                (request_id, outcome) = join_in_flight(&mut self.in_flight) => {
                    self.finish_upload(request_id, outcome);
                }
            }
        }
        info!("Capture session stopped");
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SelectFile { path, responder } => {
                let result = self.acquirer.select_file(path);
                self.publish();
                let _ = responder.send(result);
            }
            SessionCommand::Capture { responder } => {
                let result = self.capture().await;
                let _ = responder.send(result);
            }
            SessionCommand::ActivateCamera { source, responder } => {
                let result = self.activate_camera(source);
                let _ = responder.send(result);
            }
            SessionCommand::DeactivateCamera { responder } => {
                self.acquirer.release().await;
                self.publish();
                let _ = responder.send(());
            }
            SessionCommand::Shutdown { responder } => {
                // Handled in the run loop.
                let _ = responder.send(());
            }
        }
    }

    async fn capture(&mut self) -> Result<Uuid, AppError> {
        if !self.reconciler.state().accepts_capture() || self.in_flight.is_some() {
            let err = AppError::Busy(self.reconciler.state().name().to_string());
            warn!("Rejected capture: {}", err);
            return Err(err);
        }

        self.last_error = None;
        self.apply(Event::CaptureStarted);
        self.publish();

        let image = match self.acquirer.acquire().await {
            Ok(image) => image,
            Err(e) => {
                error!("Capture failed: {}", e);
                let reason = FailureReason::from(&e);
                self.last_error = Some(reason.clone());
                self.apply(Event::CaptureFailed(reason));
                self.publish();
                return Err(e);
            }
        };

        // Uploading is published before the request exists.
        self.apply(Event::UploadStarted);
        self.transmissions += 1;
        self.publish();

        let request_id = Uuid::new_v4();
        info!(
            "Request {} uploading {} ({} bytes)",
            request_id,
            image.file_name(),
            image.len()
        );
        let transmitter = self.transmitter.clone();
        let task = tokio::spawn(async move { transmitter.submit(image).await });
        self.in_flight = Some(InFlight { request_id, task });
        Ok(request_id)
    }

    fn finish_upload(&mut self, request_id: Uuid, outcome: Result<RecognitionResult, AppError>) {
        self.in_flight = None;
        match outcome {
            Ok(result) => {
                info!("Request {} succeeded", request_id);
                self.apply(Event::UploadSucceeded(result));
            }
            Err(e) => {
                error!("Request {} failed: {}", request_id, e);
                let reason = FailureReason::from(&e);
                self.last_error = Some(reason.clone());
                self.apply(Event::UploadFailed(reason));
            }
        }
        self.publish();
    }

    fn activate_camera(&mut self, source: Box<dyn VideoSource>) -> Result<PreviewReceiver, AppError> {
        let result = match &mut self.acquirer {
            Acquirer::Camera(camera) => camera.activate(source).and_then(|_| {
                camera.preview().ok_or_else(|| {
                    AppError::MediaAcquisition("camera stream closed immediately".to_string())
                })
            }),
            Acquirer::File(_) => Err(AppError::Ui(
                "camera is not available in file upload mode".to_string(),
            )),
        };
        if let Err(e) = &result {
            error!("Camera activation failed: {}", e);
            self.last_error = Some(FailureReason::from(e));
        }
        self.publish();
        result
    }

    fn apply(&mut self, event: Event) {
        if let Err(e) = self.reconciler.apply(event) {
            // Every caller checks the guard first; reaching this is a logic error.
            error!("Ignored state transition: {}", e);
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            variant: self.variant,
            state: self.reconciler.state().clone(),
            render: self.reconciler.render(),
            generation: self.reconciler.generation(),
            last_error: self.last_error.clone(),
            selected_file: self.acquirer.selected_file(),
            preview: self.acquirer.preview(),
            transmissions: self.transmissions,
        });
    }

    /// Aborts the in-flight request, if any, and settles it as Failed.
    fn abandon_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            warn!("Abandoning request {} on shutdown", in_flight.request_id);
            in_flight.task.abort();
            let reason = FailureReason::from(AppError::Transmission(
                "request aborted on shutdown".to_string(),
            ));
            self.last_error = Some(reason.clone());
            self.apply(Event::UploadFailed(reason));
        }
    }

    async fn shutdown(&mut self) {
        self.abandon_in_flight();
        self.acquirer.release().await;
        self.publish();
    }
}

impl Drop for CaptureSupervisor {
    fn drop(&mut self) {
        if self.in_flight.is_some() {
            self.abandon_in_flight();
            self.publish();
        }
    }
}

/// Resolves when the in-flight request settles; never resolves when nothing is in flight.
async fn join_in_flight(
    in_flight: &mut Option<InFlight>,
) -> (Uuid, Result<RecognitionResult, AppError>) {
    match in_flight {
        Some(flight) => {
            let outcome = match (&mut flight.task).await {
                Ok(outcome) => outcome,
                Err(e) => Err(AppError::Transmission(format!(
                    "upload task ended abnormally: {}",
                    e
                ))),
            };
            (flight.request_id, outcome)
        }
        None => std::future::pending().await,
    }
}
