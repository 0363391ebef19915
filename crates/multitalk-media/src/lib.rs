#![deny(unreachable_patterns)]
//! yt-dlp and FFmpeg CLI wrappers for dataset preparation.
//!
//! This crate provides:
//! - Square crop geometry from normalized face boxes
//! - Type-safe FFmpeg command building with timeouts
//! - Frame dimension probing through FFprobe
//! - Source video download through yt-dlp
//! - Crop/trim/scale clip rendering

pub mod clip;
pub mod command;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod geometry;
pub mod probe;

pub use clip::{build_clip_command, render_clip, OutputFormat};
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use download::{download_video, youtube_url, DownloadOptions, DEFAULT_YOUTUBE_BASE_URL};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{is_nonempty_file, move_file, partial_path};
pub use geometry::{normalize, DEFAULT_EXPAND_RATIO};
pub use probe::{frame_dimensions, probe_video, VideoInfo};
