use thiserror::Error;

#[derive(Error, Debug)]
pub enum LineArtError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Unsupported export: {0}")]
    UnsupportedExport(String),

    #[error("A processing run is already in progress")]
    Busy,

    #[error("Vision library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("Processing failed: {0}")]
    ProcessingFailure(String),

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

impl LineArtError {
    /// Message suitable for showing to the person driving the session.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(_) => "Please select an image file".to_string(),
            Self::NotReady(reason) => reason.clone(),
            Self::UnsupportedExport(reason) => reason.clone(),
            Self::Busy => "Processing is already running, please wait".to_string(),
            Self::LibraryUnavailable(_) => "Using basic edge detection".to_string(),
            other => format!("Error processing image: {other}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, LineArtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_match_the_surface_alerts() {
        assert_eq!(
            LineArtError::InvalidInput("text/plain".into()).user_message(),
            "Please select an image file"
        );
        assert_eq!(
            LineArtError::NotReady("Please upload an image first".into()).user_message(),
            "Please upload an image first"
        );
        let failure = LineArtError::ProcessingFailure("boom".into()).user_message();
        assert!(failure.starts_with("Error processing image:"));
    }
}
