use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError as MpscTryRecvError;
use tracing::{debug, error, info, warn};

use crate::app::views::{camera_view::CameraView, result_view::ResultView, View};
use crate::capture::source;
use crate::config::{CaptureSettings, Settings};
use crate::error::{AppError, FailureReason};
use crate::pipeline::Render;
use crate::session::{CaptureSession, CaptureSessionHandle, SessionSnapshot};
use crate::transmit::Variant;

const WINDOW_TITLE: &str = "Face Recognition";
const MAX_ERROR_LOG: usize = 50;

pub enum UiUpdate {
    CommandFailed(AppError),
}

pub struct CaptureApp {
    // Dropped with the window; this releases the camera.
    _session: CaptureSession,
    handle: CaptureSessionHandle,
    capture_settings: CaptureSettings,
    path_input: String,
    camera_view: CameraView,
    result_view: ResultView,
    ui_update_rx: mpsc::Receiver<UiUpdate>,
    ui_update_tx: mpsc::Sender<UiUpdate>,
    errors: Vec<AppError>,
}

impl CaptureApp {
    pub fn new(
        session: CaptureSession,
        handle: CaptureSessionHandle,
        capture_settings: CaptureSettings,
    ) -> Self {
        let (ui_update_tx, ui_update_rx) = mpsc::channel::<UiUpdate>(100);
        Self {
            _session: session,
            handle,
            capture_settings,
            path_input: String::new(),
            camera_view: CameraView::new(),
            result_view: ResultView::new(),
            ui_update_rx,
            ui_update_tx,
            errors: Vec::new(),
        }
    }

    pub fn start_gui(settings: &Settings) -> Result<(), AppError> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(egui::vec2(900.0, 720.0))
                .with_title(WINDOW_TITLE),
            ..Default::default()
        };

        let (session, handle) = CaptureSession::from_settings(settings)?;
        let capture_settings = settings.capture.clone();
        info!(
            "Starting {:?} client against {}",
            settings.server.variant, settings.server.base_url
        );

        eframe::run_native(
            WINDOW_TITLE,
            options,
            Box::new(move |cc| {
                egui_extras::install_image_loaders(&cc.egui_ctx);
                Ok(Box::new(CaptureApp::new(session, handle, capture_settings)))
            }),
        )
        .map_err(|e| AppError::Ui(e.to_string()))
    }

    /// Runs a session command off the UI thread; failures land in the error log.
    fn dispatch<F, Fut>(&self, command: F)
    where
        F: FnOnce(CaptureSessionHandle) -> Fut,
        Fut: std::future::Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let future = command(self.handle.clone());
        let ui_update_tx = self.ui_update_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = future.await {
                warn!("Session command failed: {}", e);
                if let Err(e) = ui_update_tx.send(UiUpdate::CommandFailed(e)).await {
                    error!("Error sending UI update: {:?}", e.to_string());
                }
            }
        });
    }

    fn select_file(&self, path: PathBuf) {
        debug!("File chosen in UI: {}", path.display());
        self.dispatch(move |handle| async move { handle.select_file(path).await });
    }

    fn capture(&self) {
        self.dispatch(|handle| async move { handle.capture().await.map(|_| ()) });
    }

    fn start_camera(&self) {
        match source::from_settings(&self.capture_settings) {
            Ok(source) => self.dispatch(move |handle| async move {
                handle.activate_camera(source).await.map(|_| ())
            }),
            Err(e) => {
                error!("Camera source unavailable: {}", e);
                if let Err(e) = self.ui_update_tx.try_send(UiUpdate::CommandFailed(e)) {
                    error!("Error sending UI update: {:?}", e.to_string());
                }
            }
        }
    }

    fn stop_camera(&self) {
        self.dispatch(|handle| async move { handle.deactivate_camera().await });
    }

    fn drain_ui_updates(&mut self) {
        loop {
            match self.ui_update_rx.try_recv() {
                Ok(UiUpdate::CommandFailed(e)) => {
                    self.errors.push(e);
                    if self.errors.len() > MAX_ERROR_LOG {
                        self.errors.remove(0);
                    }
                }
                Err(MpscTryRecvError::Empty) => break,
                Err(MpscTryRecvError::Disconnected) => {
                    error!("UI update receiver disconnected");
                    break;
                }
            }
        }
    }

    fn take_dropped_file(ctx: &egui::Context) -> Option<PathBuf> {
        ctx.input(|input| {
            input
                .raw
                .dropped_files
                .iter()
                .find_map(|file| file.path.clone())
        })
    }

    fn draw_file_controls(&mut self, ui: &mut egui::Ui, snapshot: &SessionSnapshot) {
        ui.horizontal(|ui| {
            ui.label("Image file:");
            ui.text_edit_singleline(&mut self.path_input);
            if ui.button("Select").clicked() && !self.path_input.trim().is_empty() {
                self.select_file(PathBuf::from(self.path_input.trim()));
            }
        });
        ui.label("You can also drop a file onto this window.");

        match &snapshot.selected_file {
            Some(path) => ui.label(format!("Selected: {}", path.display())),
            None => ui.label("No file selected"),
        };

        let can_upload = !snapshot.is_busy() && snapshot.selected_file.is_some();
        if ui
            .add_enabled(can_upload, egui::Button::new("Upload"))
            .clicked()
        {
            self.capture();
        }
    }

    fn draw_camera_controls(&mut self, ui: &mut egui::Ui, snapshot: &SessionSnapshot) {
        self.camera_view.attach(snapshot.preview.clone());
        self.camera_view.draw(ui);

        ui.horizontal(|ui| {
            let can_capture = !snapshot.is_busy() && snapshot.camera_active();
            if ui
                .add_enabled(can_capture, egui::Button::new("Capture"))
                .clicked()
            {
                self.capture();
            }
            if snapshot.camera_active() {
                if ui.button("Stop camera").clicked() {
                    self.stop_camera();
                }
            } else if ui.button("Start camera").clicked() {
                self.start_camera();
            }
        });
    }
}

/// The error to show above the result, unless the result view already renders it.
fn banner_error(snapshot: &SessionSnapshot) -> Option<&FailureReason> {
    match snapshot.render {
        Render::Error(_) => None,
        _ => snapshot.last_error.as_ref(),
    }
}

impl eframe::App for CaptureApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_ui_updates();
        let snapshot = self.handle.snapshot();

        if snapshot.variant == Variant::FileUpload {
            if let Some(path) = Self::take_dropped_file(ctx) {
                self.path_input = path.display().to_string();
                self.select_file(path);
            }
        }

        egui::TopBottomPanel::top("title").show(ctx, |ui| {
            ui.heading(WINDOW_TITLE);
            ui.label(match snapshot.variant {
                Variant::FileUpload => "Upload a photo to identify the face in it.",
                Variant::CameraRecognize => "Capture a frame from the camera to identify faces.",
            });
        });

        egui::TopBottomPanel::bottom("error_panel")
            .resizable(true)
            .show(ctx, |ui| {
                ui.heading("Error Log");
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for error in self.errors.iter().rev() {
                        ui.label(format!("[ERROR] {}", error));
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            match snapshot.variant {
                Variant::FileUpload => self.draw_file_controls(ui, &snapshot),
                Variant::CameraRecognize => self.draw_camera_controls(ui, &snapshot),
            }

            ui.separator();
            if let Some(reason) = banner_error(&snapshot) {
                ui.colored_label(egui::Color32::RED, reason.to_string());
            }

            self.result_view.update(snapshot.render.clone());
            self.result_view.draw(ui);
        });

        ctx.request_repaint_after(Duration::from_millis(33));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::{Phase, RequestState};

    fn snapshot(render: Render, last_error: Option<FailureReason>) -> SessionSnapshot {
        SessionSnapshot {
            variant: Variant::CameraRecognize,
            state: RequestState::Idle,
            render,
            generation: 0,
            last_error,
            selected_file: None,
            preview: None,
            transmissions: 0,
        }
    }

    #[test]
    fn failed_upload_error_is_shown_once() {
        let reason = FailureReason {
            kind: ErrorKind::Transmission,
            message: "connection refused".to_string(),
        };
        let failed = snapshot(Render::Error(reason.clone()), Some(reason));
        assert!(banner_error(&failed).is_none());
    }

    #[test]
    fn capture_error_is_shown_above_idle_result() {
        let reason = FailureReason {
            kind: ErrorKind::MediaAcquisition,
            message: "camera stream is not active".to_string(),
        };
        let idle = snapshot(Render::Progress(Phase::Idle), Some(reason.clone()));
        assert_eq!(banner_error(&idle), Some(&reason));
    }
}
