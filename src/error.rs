use serde::Serialize;

/// Every failure an action can surface to the operator.
#[derive(Debug, thiserror::Error)]
pub enum KitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("AI API returned {status}: {body}")]
    Ai { status: u16, body: String },

    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Extracted text is empty or too short ({chars} chars)")]
    EmptyText { chars: usize },

    #[error("An extraction is already running")]
    ExtractionInFlight,

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    #[error("{0}")]
    Custom(String),
}

impl KitError {
    /// Build a `Backend` error from a non-success response, consuming its body.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        KitError::Backend { status, body }
    }
}

// Notices and JSON output carry errors as plain strings.
impl Serialize for KitError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_message() {
        let err = KitError::NotFound("module 42".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#""Not found: module 42""#);
    }

    #[test]
    fn test_io_conversion() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, KitError::Io(_)));
        assert!(err.to_string().contains("disk gone"));
    }
}
