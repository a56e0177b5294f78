use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::capture::CapturedImage;
use crate::config::ServerSettings;
use crate::error::AppError;
use crate::pipeline::RecognitionResult;
use crate::transmit::{ResponseContract, Variant};

/// Sends one captured image and interprets the response.
#[async_trait]
pub trait Transmitter: Send + Sync {
    async fn submit(&self, image: CapturedImage) -> Result<RecognitionResult, AppError>;
}

/// HTTP transmitter posting a single multipart `file` field.
#[derive(Debug, Clone)]
pub struct RecognitionClient {
    client: reqwest::Client,
    url: String,
    variant: Variant,
}

impl RecognitionClient {
    pub fn new(settings: &ServerSettings) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Transmission(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: settings.variant.url(&settings.base_url),
            variant: settings.variant,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }
}

#[async_trait]
impl Transmitter for RecognitionClient {
    async fn submit(&self, image: CapturedImage) -> Result<RecognitionResult, AppError> {
        tracing::debug!(
            "Sending {} ({} bytes) to {}",
            image.file_name(),
            image.len(),
            self.url
        );

        let file_name = image.file_name().to_string();
        let mime_type = image.mime_type().to_string();
        let file_part = Part::bytes(image.into_bytes())
            .file_name(file_name)
            .mime_str(&mime_type)
            .map_err(|e| AppError::Transmission(format!("failed to build multipart part: {}", e)))?;
        let form = Form::new().part("file", file_part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Transmission(format!("request to {} timed out", self.url))
                } else {
                    AppError::Transmission(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(AppError::Transmission(format!(
                "recognition service returned {}: {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Decode(format!("failed to read response body: {}", e)))?;
        tracing::debug!("Received {} byte response from {}", body.len(), self.url);

        match self.variant.contract() {
            ResponseContract::Text => Ok(RecognitionResult::Text(body)),
            ResponseContract::Json => RecognitionResult::from_json(&body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmit::test_server::setup_test_server;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    fn client_for(addr: SocketAddr, variant: Variant) -> RecognitionClient {
        RecognitionClient::new(&ServerSettings {
            base_url: format!("http://{}", addr),
            variant,
            request_timeout_secs: Some(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn file_upload_posts_single_file_field_and_returns_text() {
        let (addr, requests) = setup_test_server(200, "match: none").await;
        let client = client_for(addr, Variant::FileUpload);

        let image = CapturedImage::from_file(b"PNGDATA".to_vec(), std::path::Path::new("face.png"));
        let result = client.submit(image).await.unwrap();

        assert_eq!(result, RecognitionResult::Text("match: none".to_string()));
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.starts_with("POST /upload-face HTTP/1.1"));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains(r#"name="file"; filename="face.png""#));
        assert!(request.contains("PNGDATA"));
        assert_eq!(request.matches("Content-Disposition").count(), 1);
    }

    #[tokio::test]
    async fn camera_capture_posts_photo_jpg_and_parses_json() {
        let (addr, requests) = setup_test_server(200, r#"{"image": "aGVsbG8=", "name": "Known Person"}"#).await;
        let client = client_for(addr, Variant::CameraRecognize);

        let result = client.submit(CapturedImage::jpeg(vec![0xFF, 0xD8, 0xFF])).await.unwrap();

        let RecognitionResult::Recognition(payload) = result else {
            panic!("expected a recognition payload");
        };
        assert_eq!(
            payload.image_data_uri().as_deref(),
            Some("data:image/jpeg;base64,aGVsbG8=")
        );
        assert_eq!(payload.metadata["name"], "Known Person");
        let requests = requests.lock().unwrap();
        assert!(requests[0].starts_with("POST /recognize-face HTTP/1.1"));
        assert!(requests[0].contains(r#"filename="photo.jpg""#));
        assert!(requests[0].contains("image/jpeg"));
    }

    #[tokio::test]
    async fn server_error_is_transmission_error() {
        let (addr, _) = setup_test_server(500, "No file provided").await;
        let client = client_for(addr, Variant::FileUpload);

        let err = client.submit(CapturedImage::jpeg(vec![1])).await.unwrap_err();
        assert!(matches!(err, AppError::Transmission(ref msg) if msg.contains("No file provided")));
    }

    #[tokio::test]
    async fn non_json_body_is_decode_error_for_camera_variant() {
        let (addr, _) = setup_test_server(200, "match: none").await;
        let client = client_for(addr, Variant::CameraRecognize);

        let err = client.submit(CapturedImage::jpeg(vec![1])).await.unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_transmission_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = client_for(addr, Variant::FileUpload);

        let err = client.submit(CapturedImage::jpeg(vec![1])).await.unwrap_err();
        assert!(matches!(err, AppError::Transmission(_)));
    }
}
