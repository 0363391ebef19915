//! Worker error types.
//!
//! Per-clip failures never surface here: the job runner turns them into
//! `JobOutcome`s. These errors end a language partition or the whole run.

use thiserror::Error;

use multitalk_models::AnnotationError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),

    #[error("Annotation download failed: {0}")]
    AnnotationFetch(String),

    #[error("Media error: {0}")]
    Media(#[from] multitalk_media::MediaError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn annotation_fetch(msg: impl Into<String>) -> Self {
        Self::AnnotationFetch(msg.into())
    }

    /// Configuration problems abort the whole run; everything else only
    /// ends the current partition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkerError::Config(_))
    }
}
