//! Error types for the cadenza relay

use thiserror::Error;

/// Result type alias for transcription and segmentation operations
pub type TranscribeResult<T> = Result<T, TranscribeError>;

/// Errors that can occur while relaying audio through the transcription pipeline
#[derive(Error, Debug)]
pub enum TranscribeError {
    /// Client-caused: missing field, bad base64, oversized payload, non-positive window width.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Non-success response from the transcription API; carries the upstream status and body text.
    #[error("upstream transcription error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("transcription request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl TranscribeError {
    /// True when the failure was caused by the client's own input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, TranscribeError::InvalidInput(_))
    }
}
