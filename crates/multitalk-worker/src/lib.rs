//! MultiTalk dataset preparation worker.
//!
//! This crate provides:
//! - Lazy clip descriptor loading from annotation files
//! - A bounded-concurrency job runner with per-source single-flight retrieval
//! - Collaborator traits over yt-dlp, ffprobe and ffmpeg
//! - Failure logging and batch tallies
//! - Annotation file download

pub mod annotation_fetch;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod runner;
pub mod source_cache;

pub use annotation_fetch::{annotation_url, ensure_annotation};
pub use collaborators::{
    ClipTransformer, Collaborators, FfmpegTransformer, FfprobeProber, FrameProber,
    TransformRequest, VideoRetriever, YtDlpRetriever,
};
pub use config::PipelineConfig;
pub use error::{WorkerError, WorkerResult};
pub use loader::{AnnotationSet, Descriptors, LoadMode, LoadReport, SkippedRecord};
pub use logging::{init_tracing, ClipLogger};
pub use pipeline::{run_partition, PartitionOptions};
pub use report::{BatchSummary, FailureLog};
pub use retry::{retry_async, RetryConfig, RetryResult};
pub use runner::{JobRunner, RunMode, RunnerSettings};
pub use source_cache::{SourceCache, SourceResolution};
