//! Shared data models for the MultiTalk dataset pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Annotation records as published with the dataset
//! - Clip descriptors (one per output clip)
//! - Normalized face boxes and pixel crop rectangles
//! - Job outcomes and failure stages

pub mod annotation;
pub mod clip;
pub mod language;
pub mod outcome;
pub mod rect;

// Re-export common types
pub use annotation::{AnnotationError, AnnotationRecord, AnnotationResult};
pub use clip::{raw_file_name, ClipDescriptor, TimeRange};
pub use language::{is_valid_language, VALID_LANGUAGES};
pub use outcome::{FailureStage, JobOutcome, JobStatus};
pub use rect::{CropRectangle, NormalizedBox};
