//! Live camera capture from a V4L2 device through a GStreamer appsink.

use std::time::Duration;

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use image::{DynamicImage, RgbImage};

use crate::capture::source::VideoSource;
use crate::error::AppError;

pub struct V4l2Source {
    name: String,
    device: String,
    width: u32,
    height: u32,
    interval: Duration,
    pipeline: Option<gst::Pipeline>,
    appsink: Option<gst_app::AppSink>,
}

impl V4l2Source {
    pub fn new(device: String, width: u32, height: u32, interval: Duration) -> Self {
        Self {
            name: format!("v4l2:{}", device),
            device,
            width,
            height,
            interval,
            pipeline: None,
            appsink: None,
        }
    }

    fn describe_pipeline(&self) -> String {
        format!(
            "v4l2src device={} ! videoconvert ! videoscale \
             ! video/x-raw,format=RGB,width={},height={} \
             ! appsink name=sink max-buffers=1 drop=true sync=false",
            self.device, self.width, self.height
        )
    }
}

impl VideoSource for V4l2Source {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<(), AppError> {
        gst::init().map_err(|e| {
            AppError::MediaAcquisition(format!("failed to initialize GStreamer: {}", e))
        })?;

        let pipeline = gst::parse::launch(&self.describe_pipeline())
            .map_err(|e| AppError::MediaAcquisition(format!("invalid camera pipeline: {}", e)))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| AppError::MediaAcquisition("camera pipeline is not a bin".to_string()))?;

        let appsink = pipeline
            .by_name("sink")
            .and_then(|element| element.downcast::<gst_app::AppSink>().ok())
            .ok_or_else(|| AppError::MediaAcquisition("camera pipeline has no appsink".to_string()))?;

        // Permission denied and missing devices are reported when the pipeline starts.
        pipeline.set_state(gst::State::Playing).map_err(|e| {
            let _ = pipeline.set_state(gst::State::Null);
            AppError::MediaAcquisition(format!("cannot start camera {}: {}", self.device, e))
        })?;

        tracing::info!("Camera {} streaming at {}x{}", self.device, self.width, self.height);
        self.pipeline = Some(pipeline);
        self.appsink = Some(appsink);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<DynamicImage>, AppError> {
        let appsink = self
            .appsink
            .as_ref()
            .ok_or_else(|| AppError::MediaAcquisition(format!("{} read before open", self.name)))?;

        let timeout = gst::ClockTime::from_mseconds(self.interval.as_millis() as u64);
        let Some(sample) = appsink.try_pull_sample(timeout) else {
            if appsink.is_eos() {
                return Err(AppError::MediaAcquisition(format!(
                    "camera {} stopped streaming",
                    self.device
                )));
            }
            return Ok(None);
        };

        let buffer = sample
            .buffer()
            .ok_or_else(|| AppError::MediaAcquisition("camera sample has no buffer".to_string()))?;
        let map = buffer
            .map_readable()
            .map_err(|e| AppError::MediaAcquisition(format!("cannot map camera buffer: {}", e)))?;

        match RgbImage::from_raw(self.width, self.height, map.as_slice().to_vec()) {
            Some(image) => Ok(Some(DynamicImage::ImageRgb8(image))),
            None => {
                tracing::warn!(
                    "Dropping camera frame of {} bytes: expected {}x{} RGB",
                    map.size(),
                    self.width,
                    self.height
                );
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.appsink = None;
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.set_state(gst::State::Null) {
                tracing::error!("Failed to stop camera pipeline: {}", e);
            }
        }
    }
}
