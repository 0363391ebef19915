//! Per-clip job outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage that rejected a clip after its source was available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Reading frame dimensions from the raw video
    Probe,
    /// Computing the crop window
    Geometry,
    /// Running ffmpeg
    Transform,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Probe => "probe",
            FailureStage::Geometry => "geometry",
            FailureStage::Transform => "ffmpeg",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal status of one descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    /// Source was already cached, nothing fetched (download-only runs)
    Skipped,
    /// Source fetched by this run (download-only runs)
    Downloaded,
    /// Source could not be retrieved
    RetrievalFailed { reason: String },
    /// Source was available but the clip could not be produced
    ProcessingFailed { stage: FailureStage, reason: String },
    /// Output clip written
    Done,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Skipped => "skipped",
            JobStatus::Downloaded => "downloaded",
            JobStatus::RetrievalFailed { .. } => "retrieval_failed",
            JobStatus::ProcessingFailed { .. } => "processing_failed",
            JobStatus::Done => "done",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            JobStatus::RetrievalFailed { .. } | JobStatus::ProcessingFailed { .. }
        )
    }
}

/// Result of processing one clip descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub source_id: String,
    pub output_name: String,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl JobOutcome {
    pub fn new(
        source_id: impl Into<String>,
        output_name: impl Into<String>,
        status: JobStatus,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            output_name: output_name.into(),
            status,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// Line for the failure log, `None` for successful outcomes.
    ///
    /// Format: `<source_id>, ERROR (<stage>): <reason>`.
    pub fn failure_line(&self) -> Option<String> {
        match &self.status {
            JobStatus::RetrievalFailed { reason } => {
                Some(format!("{}, ERROR (download): {}", self.source_id, one_line(reason)))
            }
            JobStatus::ProcessingFailed { stage, reason } => Some(format!(
                "{}, ERROR ({}): {}",
                self.source_id,
                stage,
                one_line(reason)
            )),
            _ => None,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failure_line() {
            Some(line) => write!(f, "{}", line),
            None => write!(
                f,
                "{} -> {}, {}",
                self.source_id,
                self.output_name,
                self.status.as_str().to_uppercase()
            ),
        }
    }
}

/// Keep log entries on one line; tool stderr often spans several.
fn one_line(reason: &str) -> String {
    reason.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_line_format() {
        let outcome = JobOutcome::new(
            "abc123",
            "clip.mp4",
            JobStatus::ProcessingFailed {
                stage: FailureStage::Transform,
                reason: "exit code 1\nInvalid crop".to_string(),
            },
        );
        assert_eq!(
            outcome.failure_line().as_deref(),
            Some("abc123, ERROR (ffmpeg): exit code 1 Invalid crop")
        );

        let outcome = JobOutcome::new(
            "abc123",
            "clip.mp4",
            JobStatus::RetrievalFailed {
                reason: "Video unavailable".to_string(),
            },
        );
        assert_eq!(
            outcome.failure_line().as_deref(),
            Some("abc123, ERROR (download): Video unavailable")
        );
    }

    #[test]
    fn test_success_has_no_failure_line() {
        let outcome = JobOutcome::new("abc123", "clip.mp4", JobStatus::Done);
        assert!(!outcome.is_failure());
        assert!(outcome.failure_line().is_none());
        assert_eq!(outcome.to_string(), "abc123 -> clip.mp4, DONE");
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = JobOutcome::new(
            "abc123",
            "clip.mp4",
            JobStatus::ProcessingFailed {
                stage: FailureStage::Geometry,
                reason: "degenerate".to_string(),
            },
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "processing_failed");
        assert_eq!(json["stage"], "geometry");
        assert_eq!(json["source_id"], "abc123");
    }
}
