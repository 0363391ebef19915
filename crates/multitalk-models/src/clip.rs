//! Clip descriptor models.

use serde::{Deserialize, Serialize};

use crate::NormalizedBox;

/// Time range of a clip inside its source video, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl TimeRange {
    pub fn new(start_secs: f64, end_secs: f64) -> Self {
        Self {
            start_secs,
            end_secs,
        }
    }

    /// Clip length in seconds.
    pub fn duration(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// `0 <= start < end`, both finite.
    pub fn is_valid(&self) -> bool {
        self.start_secs.is_finite()
            && self.end_secs.is_finite()
            && self.start_secs >= 0.0
            && self.start_secs < self.end_secs
    }
}

/// Everything needed to produce one output clip.
///
/// Built once from an annotation record and consumed once by the job runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDescriptor {
    /// Key into the retrieval tool (a YouTube video id).
    pub source_id: String,
    /// Destination file name, unique per descriptor.
    pub output_name: String,
    pub time_range: TimeRange,
    pub bbox: NormalizedBox,
    /// Partition key; clips without one land in the dataset root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ClipDescriptor {
    /// Raw video file name shared by every clip cut from the same source.
    pub fn raw_file_name(&self) -> String {
        raw_file_name(&self.source_id)
    }
}

/// Cache file name for a source id.
pub fn raw_file_name(source_id: &str) -> String {
    format!("{}.mp4", source_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_validity() {
        assert!(TimeRange::new(0.0, 1.5).is_valid());
        assert!(!TimeRange::new(2.0, 2.0).is_valid());
        assert!(!TimeRange::new(-1.0, 2.0).is_valid());
        assert!(!TimeRange::new(0.0, f64::INFINITY).is_valid());
        assert!((TimeRange::new(1.25, 4.0).duration() - 2.75).abs() < 1e-9);
    }

    #[test]
    fn test_raw_file_name() {
        let clip = ClipDescriptor {
            source_id: "dQw4w9WgXcQ".to_string(),
            output_name: "clip_0001.mp4".to_string(),
            time_range: TimeRange::new(0.0, 3.0),
            bbox: NormalizedBox::new(0.1, 0.5, 0.2, 0.6),
            language: None,
        };
        assert_eq!(clip.raw_file_name(), "dQw4w9WgXcQ.mp4");
    }
}
