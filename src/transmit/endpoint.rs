use serde::{Deserialize, Serialize};

/// The deployment variant: acquisition mode, endpoint and response contract travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// User-selected file to `/upload-face`, plain-text response.
    #[default]
    FileUpload,
    /// Camera frame to `/recognize-face`, JSON response.
    CameraRecognize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseContract {
    Text,
    Json,
}

impl Variant {
    pub fn path(&self) -> &'static str {
        match self {
            Variant::FileUpload => "/upload-face",
            Variant::CameraRecognize => "/recognize-face",
        }
    }

    pub fn contract(&self) -> ResponseContract {
        match self {
            Variant::FileUpload => ResponseContract::Text,
            Variant::CameraRecognize => ResponseContract::Json,
        }
    }

    pub fn uses_camera(&self) -> bool {
        matches!(self, Variant::CameraRecognize)
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim().trim_end_matches('/'), self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_without_double_slash() {
        assert_eq!(
            Variant::FileUpload.url("http://localhost:8080/"),
            "http://localhost:8080/upload-face"
        );
        assert_eq!(
            Variant::CameraRecognize.url("http://localhost:5000"),
            "http://localhost:5000/recognize-face"
        );
    }
}
