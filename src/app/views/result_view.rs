use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use egui::load::Bytes;
use egui::{Color32, RichText};
use serde_json::{Map, Value};

use crate::app::views::View;
use crate::pipeline::{Phase, Render};

const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Shows whatever the reconciler says should be on screen.
pub struct ResultView {
    render: Render,
    /// Decoded result image, keyed by the generation it belongs to.
    decoded: Option<(u64, Result<Bytes, String>)>,
}

impl Default for ResultView {
    fn default() -> Self {
        Self {
            render: Render::Progress(Phase::Idle),
            decoded: None,
        }
    }
}

impl ResultView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, render: Render) {
        self.render = render;
    }

    fn decoded_image(&mut self, generation: u64, data_uri: &str) -> Result<Bytes, String> {
        let cached = matches!(&self.decoded, Some((cached, _)) if *cached == generation);
        if !cached {
            let decoded = data_uri
                .strip_prefix(JPEG_DATA_URI_PREFIX)
                .ok_or_else(|| "result image is not a JPEG data URI".to_string())
                .and_then(|encoded| STANDARD.decode(encoded).map_err(|e| e.to_string()))
                .map(Bytes::from);
            self.decoded = Some((generation, decoded));
        }
        match &self.decoded {
            Some((_, decoded)) => decoded.clone(),
            None => Err("result image missing".to_string()),
        }
    }

    fn draw_progress(ui: &mut egui::Ui, phase: Phase) {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(match phase {
                Phase::Idle => "Waiting for an image",
                Phase::Capturing => "Capturing...",
                Phase::Uploading => "Recognizing...",
            });
        });
    }

    fn draw_metadata(ui: &mut egui::Ui, metadata: &Map<String, Value>) {
        if metadata.is_empty() {
            return;
        }
        let pretty = serde_json::to_string_pretty(metadata).unwrap_or_default();
        ui.monospace(pretty);
    }
}

impl View for ResultView {
    fn draw(&mut self, ui: &mut egui::Ui) {
        let render = self.render.clone();
        ui.group(|ui| match render {
            Render::Progress(phase) => Self::draw_progress(ui, phase),
            Render::Text { text, .. } => {
                egui::ScrollArea::horizontal().show(ui, |ui| {
                    ui.monospace(text);
                });
            }
            Render::Recognition {
                generation,
                image_data_uri,
                metadata,
            } => {
                if let Some(data_uri) = image_data_uri {
                    match self.decoded_image(generation, &data_uri) {
                        Ok(bytes) => {
                            ui.add(
                                egui::Image::from_bytes(
                                    format!("bytes://recognition-{}.jpg", generation),
                                    bytes,
                                )
                                .max_width(640.0),
                            );
                        }
                        Err(e) => {
                            ui.colored_label(Color32::RED, format!("Cannot show image: {}", e));
                        }
                    }
                }
                Self::draw_metadata(ui, &metadata);
            }
            Render::Error(reason) => {
                ui.label(RichText::new(reason.to_string()).color(Color32::RED));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_result_image_once_per_generation() {
        let mut view = ResultView::new();
        let first = view
            .decoded_image(1, "data:image/jpeg;base64,aGVsbG8=")
            .unwrap();
        assert_eq!(&*first, b"hello");

        // Same generation reuses the cached bytes even if asked with other data.
        let again = view.decoded_image(1, "data:image/jpeg;base64,d29ybGQ=").unwrap();
        assert_eq!(&*again, b"hello");

        let next = view.decoded_image(2, "data:image/jpeg;base64,d29ybGQ=").unwrap();
        assert_eq!(&*next, b"world");
    }

    #[test]
    fn rejects_non_jpeg_data_uri() {
        let mut view = ResultView::new();
        assert!(view.decoded_image(1, "data:image/png;base64,aGVsbG8=").is_err());
    }
}
