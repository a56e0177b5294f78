use egui::{ColorImage, TextureHandle, TextureOptions};
use uuid::Uuid;

use crate::app::views::View;
use crate::common::Frame;
use crate::session::PreviewReceiver;

/// Live preview of the held camera stream.
#[derive(Default)]
pub struct CameraView {
    preview: Option<PreviewReceiver>,
    texture: Option<TextureHandle>,
    shown_frame: Option<Uuid>,
}

impl CameraView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follows the session's current stream; `None` once the camera is released.
    pub fn attach(&mut self, preview: Option<PreviewReceiver>) {
        let same = match (&self.preview, &preview) {
            (Some(current), Some(next)) => current.same_channel(next),
            (None, None) => true,
            _ => false,
        };
        if !same {
            self.preview = preview;
            self.texture = None;
            self.shown_frame = None;
        }
    }

    fn latest_frame(&mut self) -> Option<Frame> {
        self.preview
            .as_mut()
            .and_then(|preview| preview.borrow_and_update().clone())
    }

    fn upload_texture(&mut self, ctx: &egui::Context, frame: &Frame) {
        let image = frame.image().to_rgb8();
        let color_image = ColorImage::from_rgb(
            [image.width() as usize, image.height() as usize],
            image.as_raw().as_slice(),
        );
        match &mut self.texture {
            Some(texture) => texture.set(color_image, TextureOptions::default()),
            None => {
                self.texture =
                    Some(ctx.load_texture("camera_preview", color_image, TextureOptions::default()))
            }
        }
        self.shown_frame = Some(frame.frame_id());
    }
}

impl View for CameraView {
    fn draw(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            if self.preview.is_none() {
                ui.label("Camera is not active.");
                return;
            }

            match self.latest_frame() {
                Some(frame) => {
                    if self.shown_frame != Some(frame.frame_id()) {
                        self.upload_texture(ui.ctx(), &frame);
                    }
                }
                None => {
                    self.texture = None;
                    self.shown_frame = None;
                }
            }

            match &self.texture {
                Some(texture) => {
                    ui.add(egui::Image::new(texture).max_width(640.0));
                }
                None => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Waiting for the camera...");
                    });
                }
            }
        });
    }
}
