//! Annotation records as published with the MultiTalk dataset.
//!
//! An annotation file is a JSON object mapping a clip key to a record:
//!
//! ```json
//! {
//!   "clip_key": {
//!     "youtube_id": "xxxxxxxxxxx",
//!     "duration": { "start_sec": 12.0, "end_sec": 17.5 },
//!     "bbox": { "top": 0.1, "bottom": 0.6, "left": 0.3, "right": 0.7 },
//!     "language": "english"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ClipDescriptor, NormalizedBox, TimeRange};

/// Result type for annotation parsing.
pub type AnnotationResult<T> = Result<T, AnnotationError>;

/// Errors raised while turning annotations into clip descriptors.
#[derive(Debug, Error, PartialEq)]
pub enum AnnotationError {
    #[error("Malformed annotation '{key}': {reason}")]
    Malformed { key: String, reason: String },

    #[error("Invalid annotation document: {0}")]
    InvalidDocument(String),
}

impl AnnotationError {
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Clip time bounds in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDuration {
    pub start_sec: f64,
    pub end_sec: f64,
}

/// Face box in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBox {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// One record of an annotation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub youtube_id: String,
    pub duration: AnnotationDuration,
    pub bbox: AnnotationBox,
    #[serde(default)]
    pub language: Option<String>,
}

impl AnnotationRecord {
    /// Parse a raw JSON value for `key`.
    pub fn from_value(key: &str, value: serde_json::Value) -> AnnotationResult<Self> {
        serde_json::from_value(value).map_err(|e| AnnotationError::malformed(key, e.to_string()))
    }

    /// Validate the record and build the descriptor for clip `key`.
    ///
    /// The output file is named `<key>.mp4`.
    pub fn into_descriptor(self, key: &str) -> AnnotationResult<ClipDescriptor> {
        if !is_plain_file_stem(key) {
            return Err(AnnotationError::malformed(key, "key is not a plain file name"));
        }

        let source_id = self.youtube_id.trim().to_string();
        if source_id.is_empty() {
            return Err(AnnotationError::malformed(key, "empty youtube_id"));
        }
        if !is_plain_file_stem(&source_id) {
            return Err(AnnotationError::malformed(
                key,
                format!("youtube_id '{}' is not a plain file name", source_id),
            ));
        }

        let time_range = TimeRange::new(self.duration.start_sec, self.duration.end_sec);
        if !time_range.is_valid() {
            return Err(AnnotationError::malformed(
                key,
                format!(
                    "invalid duration: start={} end={}",
                    self.duration.start_sec, self.duration.end_sec
                ),
            ));
        }

        let bbox = NormalizedBox::new(
            self.bbox.top,
            self.bbox.bottom,
            self.bbox.left,
            self.bbox.right,
        );
        if !bbox.is_valid() {
            return Err(AnnotationError::malformed(
                key,
                format!(
                    "invalid bbox: top={} bottom={} left={} right={}",
                    bbox.top, bbox.bottom, bbox.left, bbox.right
                ),
            ));
        }

        Ok(ClipDescriptor {
            source_id,
            output_name: format!("{}.mp4", key),
            time_range,
            bbox,
            language: self.language.filter(|l| !l.trim().is_empty()),
        })
    }
}

/// Keys and source ids become file names: one path segment, no traversal.
fn is_plain_file_stem(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains("..")
        && !name.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> serde_json::Value {
        json!({
            "youtube_id": "abcdefghijk",
            "duration": { "start_sec": 1.5, "end_sec": 4 },
            "bbox": { "top": 0.1, "bottom": 0.6, "left": 0.3, "right": 0.7 },
            "language": "english"
        })
    }

    #[test]
    fn test_record_to_descriptor() {
        let descriptor = AnnotationRecord::from_value("clip_01", record())
            .and_then(|r| r.into_descriptor("clip_01"))
            .unwrap();

        assert_eq!(descriptor.source_id, "abcdefghijk");
        assert_eq!(descriptor.output_name, "clip_01.mp4");
        assert_eq!(descriptor.time_range, TimeRange::new(1.5, 4.0));
        assert_eq!(descriptor.language.as_deref(), Some("english"));
    }

    #[test]
    fn test_missing_bbox_field() {
        let mut value = record();
        value["bbox"].as_object_mut().unwrap().remove("left");

        let err = AnnotationRecord::from_value("clip_02", value).unwrap_err();
        match err {
            AnnotationError::Malformed { key, reason } => {
                assert_eq!(key, "clip_02");
                assert!(reason.contains("left"), "reason: {}", reason);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_language_is_optional() {
        let mut value = record();
        value.as_object_mut().unwrap().remove("language");
        let descriptor = AnnotationRecord::from_value("k", value)
            .and_then(|r| r.into_descriptor("k"))
            .unwrap();
        assert_eq!(descriptor.language, None);
    }

    #[test]
    fn test_rejects_inverted_range_and_box() {
        let mut value = record();
        value["duration"] = json!({ "start_sec": 5.0, "end_sec": 2.0 });
        let err = AnnotationRecord::from_value("k", value)
            .and_then(|r| r.into_descriptor("k"))
            .unwrap_err();
        assert!(err.to_string().contains("invalid duration"));

        let mut value = record();
        value["bbox"] = json!({ "top": 0.7, "bottom": 0.2, "left": 0.3, "right": 0.7 });
        let err = AnnotationRecord::from_value("k", value)
            .and_then(|r| r.into_descriptor("k"))
            .unwrap_err();
        assert!(err.to_string().contains("invalid bbox"));
    }

    #[test]
    fn test_rejects_path_like_names() {
        for key in ["../../../escaped_clip", "nested/clip", "..", "a\\b"] {
            let err = AnnotationRecord::from_value(key, record())
                .and_then(|r| r.into_descriptor(key))
                .unwrap_err();
            assert!(err.to_string().contains("key"), "{}: {}", key, err);
        }

        for id in ["../../outside", "abc/def", ".."] {
            let mut value = record();
            value["youtube_id"] = json!(id);
            let err = AnnotationRecord::from_value("clip", value)
                .and_then(|r| r.into_descriptor("clip"))
                .unwrap_err();
            assert!(err.to_string().contains("youtube_id"), "{}: {}", id, err);
        }

        // Dashes and underscores are ordinary YouTube id characters.
        let mut value = record();
        value["youtube_id"] = json!("-_aB3xYz9Q0");
        assert!(AnnotationRecord::from_value("clip_01", value)
            .and_then(|r| r.into_descriptor("clip_01"))
            .is_ok());
    }
}
