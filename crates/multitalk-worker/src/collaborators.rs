//! External tool seams: retrieval, frame probing, clip transform.
//!
//! The job runner only talks to these traits, so tests drive it with
//! in-memory fakes and production wires in yt-dlp/ffprobe/ffmpeg.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use multitalk_media::{
    download_video, frame_dimensions, render_clip, DownloadOptions, FfmpegRunner, MediaResult,
    OutputFormat,
};
use multitalk_models::{CropRectangle, TimeRange};

use crate::config::PipelineConfig;

/// Fetches a source video into the raw cache.
///
/// Implementations must do nothing when `destination` already holds a
/// non-empty file.
#[async_trait]
pub trait VideoRetriever: Send + Sync {
    async fn fetch(&self, source_id: &str, destination: &Path) -> MediaResult<()>;
}

/// Reads the pixel size of a video's first video stream.
#[async_trait]
pub trait FrameProber: Send + Sync {
    async fn frame_dimensions(&self, path: &Path) -> MediaResult<(u32, u32)>;
}

/// Everything the transform step needs for one clip.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub crop: CropRectangle,
    pub time_range: TimeRange,
    pub target: OutputFormat,
}

/// Trims, crops, rescales and resamples one clip.
#[async_trait]
pub trait ClipTransformer: Send + Sync {
    async fn transform(&self, request: &TransformRequest) -> MediaResult<()>;
}

/// yt-dlp backed retriever.
#[derive(Debug, Clone, Default)]
pub struct YtDlpRetriever {
    options: DownloadOptions,
}

impl YtDlpRetriever {
    pub fn new(options: DownloadOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl VideoRetriever for YtDlpRetriever {
    async fn fetch(&self, source_id: &str, destination: &Path) -> MediaResult<()> {
        download_video(source_id, destination, &self.options).await
    }
}

/// ffprobe backed prober.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeProber;

#[async_trait]
impl FrameProber for FfprobeProber {
    async fn frame_dimensions(&self, path: &Path) -> MediaResult<(u32, u32)> {
        frame_dimensions(path).await
    }
}

/// ffmpeg backed transformer.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTransformer {
    runner: FfmpegRunner,
}

impl FfmpegTransformer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(timeout),
        }
    }
}

#[async_trait]
impl ClipTransformer for FfmpegTransformer {
    async fn transform(&self, request: &TransformRequest) -> MediaResult<()> {
        render_clip(
            &request.input,
            &request.output,
            &request.crop,
            &request.time_range,
            &request.target,
            &self.runner,
        )
        .await
    }
}

/// The three collaborators the runner needs.
#[derive(Clone)]
pub struct Collaborators {
    pub retriever: Arc<dyn VideoRetriever>,
    pub prober: Arc<dyn FrameProber>,
    pub transformer: Arc<dyn ClipTransformer>,
}

impl Collaborators {
    pub fn new(
        retriever: Arc<dyn VideoRetriever>,
        prober: Arc<dyn FrameProber>,
        transformer: Arc<dyn ClipTransformer>,
    ) -> Self {
        Self {
            retriever,
            prober,
            transformer,
        }
    }

    /// Production collaborators (yt-dlp, ffprobe, ffmpeg).
    pub fn from_config(config: &PipelineConfig) -> Self {
        let options = DownloadOptions {
            base_url: config.youtube_base_url.clone(),
            cookies: config.cookies.clone(),
            timeout: Some(config.download_timeout),
            ..Default::default()
        };
        Self::new(
            Arc::new(YtDlpRetriever::new(options)),
            Arc::new(FfprobeProber),
            Arc::new(FfmpegTransformer::new(config.transform_timeout)),
        )
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_retriever_skips_cached_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("abc.mp4");
        tokio::fs::write(&dest, b"video").await.unwrap();

        let collaborators = Collaborators::from_config(&PipelineConfig::default());
        collaborators.retriever.fetch("abc", &dest).await.unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"video");
    }

    #[tokio::test]
    async fn test_transformer_rejects_missing_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let request = TransformRequest {
            input: dir.path().join("missing.mp4"),
            output: dir.path().join("out.mp4"),
            crop: CropRectangle::new(0, 100, 0, 100),
            time_range: TimeRange::new(0.0, 1.0),
            target: OutputFormat::default(),
        };
        let err = FfmpegTransformer::new(Duration::from_secs(5))
            .transform(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, multitalk_media::MediaError::FileNotFound(_)));
    }
}
