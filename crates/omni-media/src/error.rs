//! Error taxonomy for remote analysis.

use std::time::Duration;

use thiserror::Error;

/// Everything that can end an analysis workflow.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No API key configured")]
    MissingCredential,
    #[error("API key rejected: {0}")]
    CredentialInvalid(String),
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Malformed response: {0}")]
    InvalidResponse(String),
    #[error("Video processing failed: {0}")]
    RemoteProcessingFailed(String),
    #[error("Asset still processing after {attempts} status queries ({elapsed:?})")]
    PollTimeout { attempts: u32, elapsed: Duration },
    #[error("Cancelled")]
    Cancelled,
    #[error("Speech synthesis failed ({provider}): {message}")]
    Speech { provider: String, message: String },
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Short machine-readable kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::MissingCredential => "missing_credential",
            AnalysisError::CredentialInvalid(_) => "credential_invalid",
            AnalysisError::QuotaExceeded(_) => "quota_exceeded",
            AnalysisError::Transport(_) => "transport",
            AnalysisError::Api { .. } => "api",
            AnalysisError::InvalidResponse(_) => "invalid_response",
            AnalysisError::RemoteProcessingFailed(_) => "remote_processing_failed",
            AnalysisError::PollTimeout { .. } => "poll_timeout",
            AnalysisError::Cancelled => "cancelled",
            AnalysisError::Speech { .. } => "speech",
            AnalysisError::UnsupportedMedia(_) => "unsupported_media",
            AnalysisError::Io(_) => "io",
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AnalysisError::InvalidResponse(e.to_string())
        } else {
            AnalysisError::Transport(e.to_string())
        }
    }
}
