use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// What a successful request produced. The shape is fixed per deployment variant.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionResult {
    /// Plain-text body, rendered verbatim.
    Text(String),
    /// Structured recognition response.
    Recognition(RecognitionPayload),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionPayload {
    /// Base64-encoded JPEG of the processed image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Identification metadata, passed through untouched.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl RecognitionPayload {
    pub fn image_data_uri(&self) -> Option<String> {
        self.image
            .as_ref()
            .map(|image| format!("data:image/jpeg;base64,{}", image))
    }

    pub fn decode_image(&self) -> Result<Option<Vec<u8>>, AppError> {
        self.image
            .as_ref()
            .map(|image| {
                STANDARD
                    .decode(image)
                    .map_err(|e| AppError::Decode(format!("image field is not base64: {}", e)))
            })
            .transpose()
    }
}

impl RecognitionResult {
    /// Parses a JSON recognition body, rejecting an `image` that is not valid base64.
    pub fn from_json(body: &str) -> Result<Self, AppError> {
        let mut payload: RecognitionPayload = serde_json::from_str(body)
            .map_err(|e| AppError::Decode(format!("expected a JSON object: {}", e)))?;
        // Line breaks in the base64 are dropped so the rendered data URI decodes too.
        if let Some(image) = payload.image.as_mut() {
            image.retain(|c| !c.is_ascii_whitespace());
        }
        payload.decode_image()?;
        Ok(RecognitionResult::Recognition(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_field_becomes_jpeg_data_uri() {
        let result = RecognitionResult::from_json(r#"{"image": "aGVsbG8="}"#).unwrap();
        let RecognitionResult::Recognition(payload) = result else {
            panic!("expected a recognition payload");
        };
        assert_eq!(
            payload.image_data_uri().as_deref(),
            Some("data:image/jpeg;base64,aGVsbG8=")
        );
        assert_eq!(payload.decode_image().unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn whitespace_in_image_field_is_stripped_before_rendering() {
        let result = RecognitionResult::from_json("{\"image\": \"aGVs\\nbG8=\\n\"}").unwrap();
        let RecognitionResult::Recognition(payload) = result else {
            panic!("expected a recognition payload");
        };
        let data_uri = payload.image_data_uri().unwrap();
        assert_eq!(data_uri, "data:image/jpeg;base64,aGVsbG8=");
        let encoded = data_uri.strip_prefix("data:image/jpeg;base64,").unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), b"hello");
    }

    #[test]
    fn metadata_is_passed_through() {
        let result =
            RecognitionResult::from_json(r#"{"name": "Known Person", "faces": 1}"#).unwrap();
        let RecognitionResult::Recognition(payload) = result else {
            panic!("expected a recognition payload");
        };
        assert!(payload.image.is_none());
        assert_eq!(payload.metadata["name"], "Known Person");
        assert_eq!(payload.metadata["faces"], 1);
    }

    #[test]
    fn malformed_bodies_are_decode_errors() {
        assert!(matches!(
            RecognitionResult::from_json("match: none"),
            Err(AppError::Decode(_))
        ));
        assert!(matches!(
            RecognitionResult::from_json(r#"{"image": "***"}"#),
            Err(AppError::Decode(_))
        ));
    }
}
