//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! the calls are no-ops.

use metrics::{counter, histogram};

use multitalk_models::JobStatus;

/// Metric names as constants for consistency.
pub mod names {
    pub const CLIPS_TOTAL: &str = "multitalk_clips_total";
    pub const RETRIEVALS_TOTAL: &str = "multitalk_retrievals_total";
    pub const TRANSFORM_DURATION_SECONDS: &str = "multitalk_transform_duration_seconds";
}

/// Record the terminal status of one clip.
pub fn record_outcome(status: &JobStatus) {
    counter!(names::CLIPS_TOTAL, "status" => status.as_str()).increment(1);
}

/// Record one retrieval sequence (`fetched` or `failed`).
pub fn record_retrieval(result: &'static str) {
    counter!(names::RETRIEVALS_TOTAL, "result" => result).increment(1);
}

pub fn record_transform_duration(duration_secs: f64) {
    histogram!(names::TRANSFORM_DURATION_SECONDS).record(duration_secs);
}
